//! In-process `RemoteStore`
//!
//! Behaves like the Redis adapter (text values, per-key expiry, hash tables)
//! without a server. Outages can be simulated with `set_available(false)`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::error::{CacheError, CacheResult};
use crate::remote::RemoteStore;

#[derive(Debug, Clone)]
struct StoredText {
    text: String,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct MemoryStore {
    values: DashMap<String, StoredText>,
    hashes: DashMap<String, HashMap<String, String>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
            hashes: DashMap::new(),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle a simulated outage.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Read a key bypassing the outage switch.
    pub fn peek(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.values
            .get(key)
            .filter(|stored| stored.expires_at > now)
            .map(|stored| stored.text.clone())
    }

    /// Remove every key and table.
    pub fn flush(&self) {
        self.values.clear();
        self.hashes.clear();
    }

    fn check_available(&self) -> CacheResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::RemoteUnavailable("connection refused".into()))
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check_available()?;
        let now = Instant::now();
        match self.values.get(key) {
            Some(stored) if stored.expires_at > now => return Ok(Some(stored.text.clone())),
            Some(_) => {}
            None => return Ok(None),
        }
        self.values.remove_if(key, |_, stored| stored.expires_at <= now);
        Ok(None)
    }

    async fn get_with_expiry(&self, key: &str) -> CacheResult<Option<(String, Option<Duration>)>> {
        self.check_available()?;
        let now = Instant::now();
        Ok(self
            .values
            .get(key)
            .filter(|stored| stored.expires_at > now)
            .map(|stored| (stored.text.clone(), Some(stored.expires_at - now))))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        self.check_available()?;
        self.values.insert(
            key.to_string(),
            StoredText {
                text: value.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
        Ok(())
    }

    async fn hash_set(&self, table: &str, field: &str, value: &str) -> CacheResult<()> {
        self.check_available()?;
        self.hashes
            .entry(table.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_get_all(&self, table: &str) -> CacheResult<HashMap<String, String>> {
        self.check_available()?;
        Ok(self
            .hashes
            .get(table)
            .map(|fields| fields.value().clone())
            .unwrap_or_default())
    }

    async fn ping(&self) -> CacheResult<()> {
        self.check_available()
    }

    async fn close(&self) {
        self.set_available(false);
    }
}
