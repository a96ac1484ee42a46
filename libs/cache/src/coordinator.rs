//! Read-through cache coordinator
//!
//! Owns the local tier and borrows the shared remote tier. The coordinator is
//! constructed once at startup, handed to every component that reads through
//! it, and shut down explicitly.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::local::LocalStore;
use crate::remote::SharedRemoteStore;

/// Point-in-time counters of where reads were served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub local_hits: u64,
    pub remote_hits: u64,
    pub origin_fetches: u64,
    pub remote_errors: u64,
    pub decode_failures: u64,
    pub local_entries: u64,
}

#[derive(Debug, Default)]
struct Counters {
    local_hits: AtomicU64,
    remote_hits: AtomicU64,
    origin_fetches: AtomicU64,
    remote_errors: AtomicU64,
    decode_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct ReadThroughCache {
    local: Arc<LocalStore>,
    remote: SharedRemoteStore,
    config: CacheConfig,
    counters: Counters,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ReadThroughCache {
    /// Build the cache and start the local sweeper.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(remote: SharedRemoteStore, config: CacheConfig) -> CacheResult<Self> {
        config.validate()?;

        let local = Arc::new(LocalStore::new(config.local_ttl));
        let sweeper = local.spawn_sweeper(config.sweep_interval);

        info!(
            local_ttl_secs = config.local_ttl.as_secs(),
            sweep_interval_secs = config.sweep_interval.as_secs(),
            default_ttl_secs = config.default_ttl_secs,
            "ReadThroughCache initialized"
        );

        Ok(Self {
            local,
            remote,
            config,
            counters: Counters::default(),
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    /// Read `key`, falling back to `fetch` when neither tier has it.
    ///
    /// Whatever `fetch` returns, `null` and other falsy values included, is
    /// written to both tiers before it is returned; the remote copy expires
    /// after `ttl_secs`. An error from `fetch` is returned as-is and nothing
    /// is cached. Remote-tier failures are logged and never fail the call.
    pub async fn get<F, Fut, E>(&self, key: &str, fetch: F, ttl_secs: u64) -> Result<Arc<Value>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
        E: From<CacheError>,
    {
        if key.is_empty() {
            return Err(CacheError::InvalidKey("key must not be empty".into()).into());
        }
        if ttl_secs == 0 {
            return Err(CacheError::InvalidTtl.into());
        }
        let local_ttl = self.config.local_ttl_for(ttl_secs);

        if let Some(value) = self.local.get(key) {
            Counters::bump(&self.counters.local_hits);
            debug!(key, "Cache hit (local)");
            return Ok(value);
        }

        match self.remote.get_with_expiry(key).await {
            Ok(Some((text, remaining))) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => {
                    Counters::bump(&self.counters.remote_hits);
                    debug!(key, "Cache hit (remote)");
                    let value = Arc::new(value);
                    // The local copy must not outlive the remote entry it was read from.
                    let backfill_ttl = remaining.map_or(local_ttl, |left| local_ttl.min(left));
                    self.local.set_with_ttl(key, Arc::clone(&value), backfill_ttl);
                    return Ok(value);
                }
                Err(e) => {
                    // Not deleted; only a successful fetch overwrites it.
                    Counters::bump(&self.counters.decode_failures);
                    warn!(key, error = %e, "Remote cache value is not valid JSON; treating as miss");
                }
            },
            Ok(None) => debug!(key, "Cache miss"),
            Err(e) => {
                Counters::bump(&self.counters.remote_errors);
                warn!(key, error = %e, "Remote cache unavailable; fetching from origin");
            }
        }

        let value = Arc::new(fetch().await?);
        Counters::bump(&self.counters.origin_fetches);

        self.local.set_with_ttl(key, Arc::clone(&value), local_ttl);
        self.write_remote(key, &value, ttl_secs).await;

        Ok(value)
    }

    /// `get` with the configured default TTL.
    pub async fn get_default<F, Fut, E>(&self, key: &str, fetch: F) -> Result<Arc<Value>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
        E: From<CacheError>,
    {
        self.get(key, fetch, self.config.default_ttl_secs).await
    }

    /// Typed read-through: the fetcher returns `T`, the cache stores its JSON form.
    ///
    /// A cached value that does not fit `T` is reported as
    /// `CacheError::Deserialize`; the schema belongs to the call site.
    pub async fn get_json<T, F, Fut, E>(&self, key: &str, fetch: F, ttl_secs: u64) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CacheError>,
    {
        let value = self
            .get(
                key,
                || async move {
                    let typed = fetch().await?;
                    serde_json::to_value(&typed).map_err(|e| {
                        E::from(CacheError::Serialize {
                            key: key.to_string(),
                            reason: e.to_string(),
                        })
                    })
                },
                ttl_secs,
            )
            .await?;

        T::deserialize(&*value).map_err(|e| {
            E::from(CacheError::Deserialize {
                key: key.to_string(),
                reason: e.to_string(),
            })
        })
    }

    /// Drop `key` from the local tier; the remote copy ages out on its own.
    pub fn invalidate(&self, key: &str) -> bool {
        self.local.remove(key)
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn remote(&self) -> &SharedRemoteStore {
        &self.remote
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            local_hits: self.counters.local_hits.load(Ordering::Relaxed),
            remote_hits: self.counters.remote_hits.load(Ordering::Relaxed),
            origin_fetches: self.counters.origin_fetches.load(Ordering::Relaxed),
            remote_errors: self.counters.remote_errors.load(Ordering::Relaxed),
            decode_failures: self.counters.decode_failures.load(Ordering::Relaxed),
            local_entries: self.local.len() as u64,
        }
    }

    /// Stop the sweeper, drop local entries and close the remote connection.
    pub async fn shutdown(&self) {
        self.stop_sweeper();
        self.local.clear();
        self.remote.close().await;
        info!("ReadThroughCache shut down");
    }

    fn stop_sweeper(&self) {
        if let Ok(mut sweeper) = self.sweeper.lock() {
            if let Some(handle) = sweeper.take() {
                handle.abort();
            }
        }
    }

    async fn write_remote(&self, key: &str, value: &Value, ttl_secs: u64) {
        let text = match serde_json::to_string(value) {
            Ok(text) => text,
            Err(e) => {
                warn!(key, error = %e, "Could not encode value for remote cache");
                return;
            }
        };
        if let Err(e) = self.remote.set(key, &text, ttl_secs).await {
            Counters::bump(&self.counters.remote_errors);
            warn!(key, error = %e, "Remote cache write failed");
        }
    }
}

impl Drop for ReadThroughCache {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}
