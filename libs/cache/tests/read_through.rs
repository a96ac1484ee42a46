//! Behaviour of the two-tier read-through lookup
//!
//! Uses the in-process remote store so every tier is observable, and a
//! paused Tokio clock so expiry is exact.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use cache::{CacheConfig, MemoryStore, ReadThroughCache, RemoteStore};
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

fn setup() -> (ReadThroughCache, Arc<MemoryStore>) {
    let remote = Arc::new(MemoryStore::new());
    let cache = ReadThroughCache::new(remote.clone(), CacheConfig::default()).unwrap();
    (cache, remote)
}

/// Fetcher that counts its invocations and returns `value`.
fn counting(
    calls: &Arc<AtomicUsize>,
    value: Value,
) -> impl FnOnce() -> std::future::Ready<anyhow::Result<Value>> {
    let calls = Arc::clone(calls);
    move || {
        calls.fetch_add(1, Ordering::SeqCst);
        std::future::ready(Ok(value))
    }
}

#[tokio::test]
async fn unseen_key_fetches_exactly_once() {
    let (cache, _remote) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let payload = json!({"symbol": "RELIANCE", "ltp": 2501.5});

    let value = cache
        .get("quotes:RELIANCE", counting(&calls, payload.clone()), 300)
        .await
        .unwrap();

    assert_eq!(*value, payload);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn second_read_is_served_locally_even_if_fetch_would_fail() {
    let (cache, _remote) = setup();

    let first = cache
        .get("k", || async { Ok::<_, anyhow::Error>(json!(1)) }, 300)
        .await
        .unwrap();
    assert_eq!(*first, json!(1));

    let second = cache
        .get(
            "k",
            || async { Err::<Value, _>(anyhow!("fetch must not run")) },
            300,
        )
        .await
        .unwrap();
    assert_eq!(*second, json!(1));
}

#[tokio::test]
async fn remote_tier_backfills_local_without_fetching() {
    let (cache, remote) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    cache
        .get("news:top", counting(&calls, json!(["a", "b"])), 300)
        .await
        .unwrap();
    assert!(remote.peek("news:top").is_some());

    cache.local().clear();
    let value = cache
        .get("news:top", counting(&calls, json!("fresh")), 300)
        .await
        .unwrap();

    assert_eq!(*value, json!(["a", "b"]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.local().get("news:top").is_some(), "local tier refilled");
}

#[tokio::test(start_paused = true)]
async fn entries_expire_from_both_tiers() {
    let (cache, remote) = setup();
    let calls = Arc::new(AtomicUsize::new(0));

    cache.get("k", counting(&calls, json!("v1")), 1).await.unwrap();
    assert_eq!(cache.local().len(), 1);

    let sweep = cache.config().sweep_interval;
    tokio::time::sleep(Duration::from_secs(1) + sweep + Duration::from_millis(10)).await;

    assert_eq!(cache.local().len(), 0, "swept from local tier");
    assert_eq!(remote.peek("k"), None, "expired in remote tier");

    let value = cache.get("k", counting(&calls, json!("v2")), 1).await.unwrap();
    assert_eq!(*value, json!("v2"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn local_entry_never_outlives_call_ttl() {
    let (cache, _remote) = setup();
    cache
        .get("k", || async { Ok::<_, anyhow::Error>(json!(1)) }, 5)
        .await
        .unwrap();

    tokio::time::advance(Duration::from_secs(6)).await;
    assert!(cache.local().get("k").is_none());
}

#[tokio::test(start_paused = true)]
async fn default_ttl_keeps_remote_entry_for_five_minutes() {
    let (cache, remote) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    assert_eq!(cache.config().default_ttl_secs, 300);

    cache.get_default("k", counting(&calls, json!("v1"))).await.unwrap();

    // Past the local TTL, still inside the remote one.
    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(cache.local().get("k").is_none());
    let value = cache
        .get_default("k", || async { Err::<Value, _>(anyhow!("not called")) })
        .await
        .unwrap();
    assert_eq!(*value, json!("v1"));

    tokio::time::advance(Duration::from_secs(240)).await;
    assert_eq!(remote.peek("k"), None);
    let value = cache.get_default("k", counting(&calls, json!("v2"))).await.unwrap();
    assert_eq!(*value, json!("v2"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn backfilled_entry_never_outlives_remote_entry() {
    let (cache, remote) = setup();
    remote.set("k", "1", 300).await.unwrap();

    tokio::time::advance(Duration::from_secs(290)).await;
    let value = cache
        .get("k", || async { Err::<Value, _>(anyhow!("not called")) }, 300)
        .await
        .unwrap();
    assert_eq!(*value, json!(1));
    assert!(cache.local().get("k").is_some());

    tokio::time::advance(Duration::from_secs(11)).await;
    assert_eq!(remote.peek("k"), None);
    assert!(cache.local().get("k").is_none(), "local copy expired with the remote one");
}

#[tokio::test]
async fn floats_read_back_from_remote_tier_unchanged() {
    let (cache, _remote) = setup();
    let original = json!({
        "ltp": 12874.560591713891,
        "tiny": 1.0715660391465826e-75,
        "ratio": 0.1,
        "neg": -2501.55
    });

    let stored = original.clone();
    cache
        .get("px", || async move { Ok::<_, anyhow::Error>(stored) }, 300)
        .await
        .unwrap();
    cache.local().clear();

    let from_remote = cache
        .get("px", || async { Err::<Value, _>(anyhow!("not called")) }, 300)
        .await
        .unwrap();
    assert_eq!(*from_remote, original);
}

#[tokio::test]
async fn fetch_error_propagates_and_caches_nothing() {
    let (cache, remote) = setup();

    let err = cache
        .get(
            "quotes:TCS",
            || async { Err::<Value, _>(anyhow!("quote api returned 503")) },
            300,
        )
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "quote api returned 503");
    assert!(cache.local().get("quotes:TCS").is_none());
    assert_eq!(remote.peek("quotes:TCS"), None);
}

#[tokio::test]
async fn falsy_values_are_cached() {
    let (cache, remote) = setup();

    for (i, falsy) in [json!(null), json!(false), json!(0), json!(""), json!([])]
        .into_iter()
        .enumerate()
    {
        let key = format!("falsy:{}", i);
        let calls = Arc::new(AtomicUsize::new(0));
        cache.get(&key, counting(&calls, falsy.clone()), 300).await.unwrap();
        let again = cache.get(&key, counting(&calls, json!("other")), 300).await.unwrap();

        assert_eq!(*again, falsy);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(remote.peek(&key).is_some());
    }
}

#[tokio::test]
async fn remote_outage_degrades_to_origin() {
    let (cache, remote) = setup();
    remote.set_available(false);
    let calls = Arc::new(AtomicUsize::new(0));

    let value = cache
        .get("quotes:INFY", counting(&calls, json!(1520.5)), 300)
        .await
        .unwrap();

    assert_eq!(*value, json!(1520.5));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().remote_errors, 2, "failed read and failed write");

    // Still served locally while the remote tier is down.
    let again = cache
        .get("quotes:INFY", counting(&calls, json!(0)), 300)
        .await
        .unwrap();
    assert_eq!(*again, json!(1520.5));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn corrupt_remote_text_is_a_miss_and_not_deleted() {
    let (cache, remote) = setup();
    remote.set("k", "{not json", 300).await.unwrap();

    let failed = cache
        .get("k", || async { Err::<Value, _>(anyhow!("origin down")) }, 300)
        .await;
    assert!(failed.is_err());
    assert_eq!(cache.stats().decode_failures, 1);
    assert_eq!(remote.peek("k").as_deref(), Some("{not json"));

    let calls = Arc::new(AtomicUsize::new(0));
    let value = cache.get("k", counting(&calls, json!({"ok": true})), 300).await.unwrap();

    assert_eq!(*value, json!({"ok": true}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // Only a successful fetch replaces it.
    assert_eq!(remote.peek("k").as_deref(), Some(r#"{"ok":true}"#));
}

#[tokio::test]
async fn concurrent_misses_are_not_coalesced() {
    let (cache, _remote) = setup();
    let calls = Arc::new(AtomicUsize::new(0));

    let slow = |calls: Arc<AtomicUsize>| {
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok::<_, anyhow::Error>(json!("v"))
        }
    };

    let (a, b) = tokio::join!(
        cache.get("k", slow(calls.clone()), 300),
        cache.get("k", slow(calls.clone()), 300),
    );

    assert_eq!(*a.unwrap(), json!("v"));
    assert_eq!(*b.unwrap(), json!("v"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Headline {
    title: String,
    source: String,
}

#[tokio::test]
async fn typed_reads_round_trip() {
    let (cache, _remote) = setup();
    let headline = Headline {
        title: "Markets open higher".into(),
        source: "wire".into(),
    };

    let fetched = headline.clone();
    let first: Headline = cache
        .get_json("news:1", || async move { Ok::<_, anyhow::Error>(fetched) }, 300)
        .await
        .unwrap();
    assert_eq!(first, headline);

    cache.local().clear();
    let second: Headline = cache
        .get_json(
            "news:1",
            || async { Err::<Headline, _>(anyhow!("not called")) },
            300,
        )
        .await
        .unwrap();
    assert_eq!(second, headline);
}

#[tokio::test]
async fn typed_read_of_wrong_shape_is_an_error() {
    let (cache, _remote) = setup();
    cache
        .get("news:2", || async { Ok::<_, anyhow::Error>(json!(42)) }, 300)
        .await
        .unwrap();

    let result: anyhow::Result<Headline> = cache
        .get_json(
            "news:2",
            || async { Err::<Headline, _>(anyhow!("not called")) },
            300,
        )
        .await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("could not be decoded"));
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(|f| json!(f)),
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn json_round_trips_through_either_tier(original in arb_json()) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let (cache, _remote) = setup();
            let stored = original.clone();
            let from_origin = cache
                .get("rt", || async move { Ok::<_, anyhow::Error>(stored) }, 300)
                .await
                .unwrap();
            let from_local = cache
                .get("rt", || async { Err::<Value, _>(anyhow!("not called")) }, 300)
                .await
                .unwrap();
            cache.local().clear();
            let from_remote = cache
                .get("rt", || async { Err::<Value, _>(anyhow!("not called")) }, 300)
                .await
                .unwrap();

            prop_assert_eq!(&*from_origin, &original);
            prop_assert_eq!(&*from_local, &original);
            prop_assert_eq!(&*from_remote, &original);
            Ok(())
        })?;
    }
}
