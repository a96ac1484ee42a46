use std::net::SocketAddr;
use std::time::Duration;

use cache::{CacheConfig, CacheError, RedisConfig, DEFAULT_TTL_SECS};
use market_data::ingestion::UpstreamConfig;
use market_data::websocket::RegistryConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Gateway settings, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    /// Base URL of the market quote API (origin for `/v1/quotes/{symbol}`).
    pub quote_api_url: String,
    /// Remote TTL for cached quotes.
    pub quote_ttl_secs: u64,
    /// Upstream trade stream. No URL means no live feed.
    pub feed: Option<UpstreamConfig>,
    pub registry: RegistryConfig,
    /// Internal endpoint that accepts execute-trade requests.
    pub trade_execution_url: Option<String>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let redis_url = get("REDIS_URL").ok_or(ConfigError::Missing("REDIS_URL"))?;
        let mut redis = RedisConfig::new(redis_url)
            .with_tls_insecure(parse_bool("REDIS_TLS_INSECURE", get("REDIS_TLS_INSECURE"))?);
        if let Some(ms) = parse_u64("REDIS_COMMAND_TIMEOUT_MS", get("REDIS_COMMAND_TIMEOUT_MS"))? {
            redis.command_timeout = Duration::from_millis(ms);
        }

        let bind_addr = match get("BIND_ADDR") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "BIND_ADDR",
                value,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let mut cache = CacheConfig::default();
        if let Some(secs) = parse_u64("CACHE_LOCAL_TTL_SECS", get("CACHE_LOCAL_TTL_SECS"))? {
            cache.local_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_u64("CACHE_DEFAULT_TTL_SECS", get("CACHE_DEFAULT_TTL_SECS"))? {
            cache.default_ttl_secs = secs;
        }
        cache.validate()?;

        let quote_ttl_secs =
            parse_u64("QUOTE_TTL_SECS", get("QUOTE_TTL_SECS"))?.unwrap_or(DEFAULT_TTL_SECS);
        if quote_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "QUOTE_TTL_SECS",
                value: "0".to_string(),
            });
        }

        let feed = get("FEED_URL").map(|url| {
            let mut feed = UpstreamConfig::new(url);
            feed.subscribe_message = get("FEED_SUBSCRIBE_MESSAGE");
            feed
        });

        let mut registry = RegistryConfig::default();
        if let Some(capacity) = parse_u64("SUBSCRIBER_BUFFER", get("SUBSCRIBER_BUFFER"))? {
            if capacity == 0 {
                return Err(ConfigError::Invalid {
                    var: "SUBSCRIBER_BUFFER",
                    value: "0".to_string(),
                });
            }
            registry.channel_capacity = capacity as usize;
        }

        Ok(Self {
            bind_addr,
            redis,
            cache,
            quote_api_url: get("QUOTE_API_URL")
                .unwrap_or_else(|| "http://localhost:8081".to_string())
                .trim_end_matches('/')
                .to_string(),
            quote_ttl_secs,
            feed,
            registry,
            trade_execution_url: get("TRADE_EXECUTION_URL"),
        })
    }
}

fn parse_bool(var: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(raw) = value else {
        return Ok(false);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}

fn parse_u64(var: &'static str, value: Option<String>) -> Result<Option<u64>, ConfigError> {
    value
        .map(|value| value.parse().map_err(|_| ConfigError::Invalid { var, value }))
        .transpose()
}
