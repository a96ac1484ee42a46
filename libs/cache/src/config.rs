use std::time::Duration;

use crate::error::{CacheError, CacheResult};
use crate::DEFAULT_TTL_SECS;

/// Configuration for the read-through cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Upper bound on how long the local tier keeps an entry (default: 60s).
    pub local_ttl: Duration,
    /// Period of the local tier's background sweep (default: 30s).
    pub sweep_interval: Duration,
    /// Remote TTL for `get_default` (default: 300s).
    pub default_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            local_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(30),
            default_ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

impl CacheConfig {
    /// Reject configurations where the local tier could outlive the data it fronts.
    pub fn validate(&self) -> CacheResult<()> {
        if self.local_ttl.is_zero() {
            return Err(CacheError::InvalidConfig("local_ttl must be positive".into()));
        }
        if self.sweep_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "sweep_interval must be positive".into(),
            ));
        }
        if self.default_ttl_secs == 0 {
            return Err(CacheError::InvalidConfig(
                "default_ttl_secs must be positive".into(),
            ));
        }
        if self.local_ttl > Duration::from_secs(self.default_ttl_secs) {
            return Err(CacheError::InvalidConfig(format!(
                "local_ttl ({:?}) exceeds default remote ttl ({}s)",
                self.local_ttl, self.default_ttl_secs
            )));
        }
        Ok(())
    }

    /// Local TTL for an entry whose remote copy lives `ttl_secs`.
    pub fn local_ttl_for(&self, ttl_secs: u64) -> Duration {
        self.local_ttl.min(Duration::from_secs(ttl_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn test_local_longer_than_remote_rejected() {
        let config = CacheConfig {
            local_ttl: Duration::from_secs(600),
            ..CacheConfig::default()
        };
        assert!(matches!(config.validate(), Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_values_rejected() {
        let config = CacheConfig {
            sweep_interval: Duration::ZERO,
            ..CacheConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CacheConfig {
            default_ttl_secs: 0,
            ..CacheConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_local_ttl_clamped_to_call_ttl() {
        let config = CacheConfig::default();
        assert_eq!(config.local_ttl_for(1), Duration::from_secs(1));
        assert_eq!(config.local_ttl_for(3600), Duration::from_secs(60));
    }
}
