use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheResult;

/// Shared key/value tier with expiry.
///
/// Values are opaque text; encoding is the caller's job. `Ok(None)` means the
/// key is absent. Connectivity problems are always `Err`, never `Ok(None)`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// `get` plus the key's remaining lifetime; `None` when it never expires.
    async fn get_with_expiry(&self, key: &str) -> CacheResult<Option<(String, Option<Duration>)>> {
        Ok(self.get(key).await?.map(|text| (text, None)))
    }

    /// Store `value` under `key`, expiring after `ttl_secs`.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()>;

    /// Overwrite one field of a hash table.
    async fn hash_set(&self, table: &str, field: &str, value: &str) -> CacheResult<()>;

    /// Every field of a hash table; an unknown table is empty.
    async fn hash_get_all(&self, table: &str) -> CacheResult<HashMap<String, String>>;

    async fn ping(&self) -> CacheResult<()>;

    /// Release the connection. Later operations fail with `RemoteUnavailable`.
    async fn close(&self);
}

/// The single shared handle used by the cache and the feed publisher.
pub type SharedRemoteStore = Arc<dyn RemoteStore>;
