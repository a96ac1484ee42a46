//! In-process cache tier
//!
//! Entries carry their own expiry. A background sweeper removes expired
//! entries every `sweep_interval`; `get` also treats an expired entry as
//! absent so results never depend on when the last sweep ran.
//!
//! Values are shared `Arc`s: a hit hands out the cached allocation itself, so
//! readers get an immutable view and nothing can corrupt the cached copy.

use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// A cached value and when it expires.
#[derive(Debug, Clone)]
struct LocalEntry {
    value: Arc<Value>,
    expires_at: Instant,
}

impl LocalEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Single-process memory cache keyed by exact string match.
#[derive(Debug)]
pub struct LocalStore {
    entries: DashMap<String, LocalEntry>,
    ttl: Duration,
}

impl LocalStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Default TTL applied by `set`.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn set(&self, key: impl Into<String>, value: Arc<Value>) {
        self.set_with_ttl(key, value, self.ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: Arc<Value>, ttl: Duration) {
        let now = Instant::now();
        self.entries.insert(
            key.into(),
            LocalEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    /// Look up an unexpired entry.
    pub fn get(&self, key: &str) -> Option<Arc<Value>> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(Arc::clone(&entry.value)),
            Some(_) => {}
            None => return None,
        }
        // Shard guard is released above; re-check so a concurrent fresh write survives.
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        None
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Spawn the periodic sweeper.
    ///
    /// The task holds only a weak reference and exits once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let removed = store.purge_expired();
                if removed > 0 {
                    debug!(removed, remaining = store.len(), "Local cache sweep");
                }
            }
        })
    }
}
