use std::time::Duration;

use thiserror::Error;

/// Failures raised by the cache tiers.
///
/// `RemoteUnavailable` and `Timeout` are never folded into a miss: callers can
/// always tell an outage from a cold cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("remote store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("cached value for {key} could not be decoded: {reason}")]
    Deserialize { key: String, reason: String },

    #[error("value for {key} could not be encoded: {reason}")]
    Serialize { key: String, reason: String },

    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    #[error("ttl must be a positive number of seconds")]
    InvalidTtl,

    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Whether this is a connectivity failure of the remote tier.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CacheError::RemoteUnavailable(_) | CacheError::Timeout(_))
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
