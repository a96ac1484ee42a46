//! Two-tier read-through cache
//!
//! Lookup order for every read:
//!
//! ```text
//!   get(key, fetch, ttl)
//!        │
//!   ┌────▼────┐  hit
//!   │ Local   │──────────────► value
//!   └────┬────┘
//!        │ miss
//!   ┌────▼────┐  hit (backfill local)
//!   │ Remote  │──────────────► value
//!   └────┬────┘
//!        │ miss / unavailable
//!   ┌────▼────┐  (write local + remote)
//!   │ fetch() │──────────────► value
//!   └─────────┘
//! ```
//!
//! The local tier is a per-process map with a short TTL and a periodic
//! sweeper. The remote tier is any [`RemoteStore`]; production uses
//! [`RedisStore`], tests and local development use [`MemoryStore`].
//!
//! Concurrent misses on the same key are not coalesced: each caller runs the
//! full lookup and may call its own fetcher.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod local;
pub mod memory;
pub mod redis_store;
pub mod remote;

pub use config::CacheConfig;
pub use coordinator::{CacheStats, ReadThroughCache};
pub use error::{CacheError, CacheResult};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use redis_store::{RedisConfig, RedisStore};
pub use remote::{RemoteStore, SharedRemoteStore};

/// Remote TTL used when a caller does not pass one.
pub const DEFAULT_TTL_SECS: u64 = 300;
