//! Live feed integration tests
//!
//! Drives the publisher, registry and upstream client together against the
//! in-memory store and a local WebSocket server.

use std::sync::Arc;
use std::time::Duration;

use cache::{MemoryStore, RemoteStore, SharedRemoteStore};
use futures::{SinkExt, StreamExt};
use market_data::ingestion::{FeedState, UpstreamConfig, UpstreamFeed};
use market_data::metrics::FeedMetrics;
use market_data::reconnect::BackoffPolicy;
use market_data::websocket::{RegistryConfig, SubscriberRegistry, Subscription};
use market_data::{FeedPublisher, LATEST_QUOTES_TABLE};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use types::ids::Symbol;
use types::quote::Tick;

fn publisher_with(store: Arc<MemoryStore>) -> Arc<FeedPublisher> {
    let shared: SharedRemoteStore = store;
    Arc::new(FeedPublisher::new(
        shared,
        SubscriberRegistry::new(RegistryConfig::default()),
        Arc::new(FeedMetrics::new()),
        LATEST_QUOTES_TABLE,
    ))
}

fn tick(symbol: &str, price: i64, timestamp: i64) -> Tick {
    Tick::new(
        Symbol::new(symbol).unwrap(),
        Decimal::from(price),
        Decimal::ONE,
        timestamp,
    )
}

async fn next_json(subscription: &mut Subscription) -> Value {
    let frame = timeout(Duration::from_secs(5), subscription.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("registry closed");
    serde_json::from_str(&frame).unwrap()
}

#[tokio::test]
async fn test_ticks_fan_out_in_order_and_snapshot_is_last_write() {
    let store = Arc::new(MemoryStore::new());
    let publisher = publisher_with(store.clone());

    let mut first = publisher.subscribe().await;
    let mut second = publisher.subscribe().await;

    publisher.publish(&tick("A", 100, 1)).await;
    publisher.publish(&tick("B", 200, 2)).await;
    publisher.publish(&tick("A", 101, 3)).await;

    for subscription in [&mut first, &mut second] {
        let snapshot = next_json(subscription).await;
        assert_eq!(snapshot["type"], "snapshot");
        assert_eq!(snapshot["data"], serde_json::json!({}));

        let mut seen = Vec::new();
        for _ in 0..3 {
            let frame = next_json(subscription).await;
            assert_eq!(frame["type"], "trade");
            seen.push((frame["symbol"].as_str().unwrap().to_string(), frame["timestamp"].as_i64().unwrap()));
        }
        assert_eq!(
            seen,
            vec![("A".to_string(), 1), ("B".to_string(), 2), ("A".to_string(), 3)]
        );
    }

    let mut late = publisher.subscribe().await;
    let snapshot = next_json(&mut late).await;
    assert_eq!(snapshot["type"], "snapshot");
    assert_eq!(snapshot["data"]["A"]["timestamp"], 3);
    assert_eq!(snapshot["data"]["A"]["price"], 101.0);
    assert_eq!(snapshot["data"]["B"]["timestamp"], 2);
    assert!(late.try_recv().is_none());
}

#[tokio::test]
async fn test_disconnected_subscriber_is_removed() {
    let publisher = publisher_with(Arc::new(MemoryStore::new()));

    let mut staying = publisher.subscribe().await;
    let leaving = publisher.subscribe().await;
    assert_eq!(publisher.registry().active_count(), 2);

    drop(leaving);
    assert_eq!(publisher.registry().active_count(), 1);

    let report = publisher.publish(&tick("A", 100, 1)).await;
    assert_eq!(report.delivered, 1);
    assert_eq!(report.removed, 0);

    assert_eq!(next_json(&mut staying).await["type"], "snapshot");
    assert_eq!(next_json(&mut staying).await["type"], "trade");
}

#[tokio::test]
async fn test_store_outage_still_broadcasts() {
    let store = Arc::new(MemoryStore::new());
    let publisher = publisher_with(store.clone());
    store.set_available(false);

    // Snapshot degrades to an empty table rather than failing the subscriber.
    let mut subscription = publisher.subscribe().await;
    let report = publisher.publish(&tick("A", 100, 1)).await;
    assert_eq!(report.delivered, 1);

    assert_eq!(next_json(&mut subscription).await["data"], serde_json::json!({}));
    assert_eq!(next_json(&mut subscription).await["symbol"], "A");
    assert!(publisher.metrics().snapshot().store_failures >= 2);

    store.set_available(true);
    assert!(store.hash_get_all(LATEST_QUOTES_TABLE).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upstream_ticks_are_published_across_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    // First session: auth ack plus a batch, then close. Second session: one tick.
    let server = tokio::spawn(async move {
        let frames = [
            vec![
                r#"{"type":"success","msg":"connected"}"#.to_string(),
                r#"[{"symbol":"A","price":10,"size":1,"timestamp":1},{"symbol":"B","price":20,"size":1,"timestamp":2}]"#.to_string(),
            ],
            vec![r#"{"symbol":"A","price":11,"size":1,"timestamp":3}"#.to_string()],
        ];
        for session in frames {
            let (stream, _) = listener.accept().await.unwrap();
            let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();

            let subscribe = socket.next().await.unwrap().unwrap();
            assert_eq!(subscribe, Message::Text(r#"{"action":"subscribe"}"#.to_string()));

            for frame in session {
                socket.send(Message::Text(frame)).await.unwrap();
            }
            socket.close(None).await.ok();
        }
    });

    let store = Arc::new(MemoryStore::new());
    let publisher = publisher_with(store.clone());
    let mut subscription = publisher.subscribe().await;

    let mut config = UpstreamConfig::new(url);
    config.subscribe_message = Some(r#"{"action":"subscribe"}"#.to_string());
    config.backoff = BackoffPolicy {
        initial: Duration::from_millis(10),
        max: Duration::from_millis(50),
    };
    let feed = UpstreamFeed::new(config, publisher.clone());
    let state = feed.state();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(feed.run(shutdown_rx));

    assert_eq!(next_json(&mut subscription).await["type"], "snapshot");
    let symbols: Vec<Value> = {
        let mut out = Vec::new();
        for _ in 0..3 {
            out.push(next_json(&mut subscription).await["symbol"].clone());
        }
        out
    };
    assert_eq!(symbols, vec!["A", "B", "A"]);

    let latest: Value = serde_json::from_str(&store.hash_get_all(LATEST_QUOTES_TABLE).await.unwrap()["A"]).unwrap();
    assert_eq!(latest["timestamp"], 3);
    assert!(publisher.metrics().snapshot().reconnects >= 1);

    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
    assert_eq!(*state.borrow(), FeedState::Disconnected);
    server.await.unwrap();
}
