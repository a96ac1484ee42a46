//! Redis-backed `RemoteStore`
//!
//! One `ConnectionManager` is shared by every caller; it is cheap to clone
//! and reconnects on its own after a dropped connection. The first connection
//! is made lazily: until it succeeds every operation fails with
//! `RemoteUnavailable` and the cache serves from origin. Failed attempts are
//! retried at most once per `retry_interval`. Each command is bounded by
//! `command_timeout`.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::RedisResult;
use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::error::{CacheError, CacheResult};
use crate::remote::RemoteStore;

/// Connection settings for the Redis tier.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// `redis://` or `rediss://` URL.
    pub url: String,
    /// Skip TLS certificate verification on `rediss://` endpoints.
    ///
    /// Managed providers that terminate TLS with internal certificates need
    /// this. It is an explicit opt-in and logged at startup.
    pub tls_insecure: bool,
    /// Budget for establishing the initial connection (default: 5s).
    pub connect_timeout: Duration,
    /// Budget for any single command (default: 2s).
    pub command_timeout: Duration,
    /// Minimum gap between connection attempts while Redis is unreachable (default: 5s).
    pub retry_interval: Duration,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tls_insecure: false,
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(2),
            retry_interval: Duration::from_secs(5),
        }
    }

    pub fn with_tls_insecure(mut self, tls_insecure: bool) -> Self {
        self.tls_insecure = tls_insecure;
        self
    }

    pub fn is_tls(&self) -> bool {
        self.url.starts_with("rediss://")
    }

    /// URL handed to the client, with the `#insecure` marker when requested.
    pub fn connection_url(&self) -> String {
        if self.tls_insecure && self.is_tls() && !self.url.ends_with("#insecure") {
            format!("{}#insecure", self.url)
        } else {
            self.url.clone()
        }
    }

    /// URL safe to log: credentials removed.
    pub fn redacted_url(&self) -> String {
        match (self.url.find("://"), self.url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}://***@{}", &self.url[..scheme_end], &self.url[at + 1..])
            }
            _ => self.url.clone(),
        }
    }
}

enum Connection {
    /// Not connected yet; holds the time of the last failed attempt.
    Pending(Option<Instant>),
    Ready(ConnectionManager),
    Closed,
}

pub struct RedisStore {
    client: redis::Client,
    connection: Mutex<Connection>,
    connect_timeout: Duration,
    command_timeout: Duration,
    retry_interval: Duration,
    redacted_url: String,
}

impl RedisStore {
    /// Validate the URL and build the store without touching the network.
    pub fn open(config: &RedisConfig) -> CacheResult<Self> {
        let client = redis::Client::open(config.connection_url())
            .map_err(|e| CacheError::InvalidConfig(format!("redis url: {}", e)))?;

        Ok(Self {
            client,
            connection: Mutex::new(Connection::Pending(None)),
            connect_timeout: config.connect_timeout,
            command_timeout: config.command_timeout,
            retry_interval: config.retry_interval,
            redacted_url: config.redacted_url(),
        })
    }

    /// `open` followed by an immediate connection attempt.
    ///
    /// A failed attempt is logged, not returned: the store keeps retrying on
    /// later operations.
    pub async fn connect(config: &RedisConfig) -> CacheResult<Self> {
        let store = Self::open(config)?;
        if let Err(e) = store.handle().await {
            warn!(url = %store.redacted_url, error = %e, "Redis unreachable; continuing without the remote tier");
        }
        Ok(store)
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.connection.try_lock().as_deref(),
            Ok(Connection::Ready(_))
        )
    }

    async fn handle(&self) -> CacheResult<ConnectionManager> {
        let mut connection = self.connection.lock().await;
        match &*connection {
            Connection::Ready(manager) => return Ok(manager.clone()),
            Connection::Closed => {
                return Err(CacheError::RemoteUnavailable("connection closed".into()));
            }
            Connection::Pending(Some(last)) if last.elapsed() < self.retry_interval => {
                return Err(CacheError::RemoteUnavailable(
                    "connection not yet established".into(),
                ));
            }
            Connection::Pending(_) => {}
        }

        *connection = Connection::Pending(Some(Instant::now()));
        let manager = timeout(self.connect_timeout, ConnectionManager::new(self.client.clone()))
            .await
            .map_err(|_| CacheError::Timeout(self.connect_timeout))?
            .map_err(|e| CacheError::RemoteUnavailable(e.to_string()))?;

        info!(url = %self.redacted_url, "Connected to Redis");
        *connection = Connection::Ready(manager.clone());
        Ok(manager)
    }

    async fn run<T, F>(&self, op: &'static str, command: F) -> CacheResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match timeout(self.command_timeout, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(CacheError::RemoteUnavailable(format!("{}: {}", op, e))),
            Err(_) => Err(CacheError::Timeout(self.command_timeout)),
        }
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.handle().await?;
        self.run(
            "GET",
            redis::cmd("GET").arg(key).query_async::<_, Option<String>>(&mut conn),
        )
        .await
    }

    async fn get_with_expiry(&self, key: &str) -> CacheResult<Option<(String, Option<Duration>)>> {
        let mut conn = self.handle().await?;
        let (text, pttl_ms) = self
            .run(
                "GET+PTTL",
                redis::pipe()
                    .atomic()
                    .cmd("GET")
                    .arg(key)
                    .cmd("PTTL")
                    .arg(key)
                    .query_async::<_, (Option<String>, i64)>(&mut conn),
            )
            .await?;

        // PTTL: -1 means no expiry, -2 means the key is gone.
        Ok(text.map(|text| match pttl_ms {
            -1 => (text, None),
            ms => (text, Some(Duration::from_millis(ms.max(0) as u64))),
        }))
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        let mut conn = self.handle().await?;
        self.run(
            "SET",
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_secs)
                .query_async::<_, ()>(&mut conn),
        )
        .await
    }

    async fn hash_set(&self, table: &str, field: &str, value: &str) -> CacheResult<()> {
        let mut conn = self.handle().await?;
        self.run(
            "HSET",
            redis::cmd("HSET")
                .arg(table)
                .arg(field)
                .arg(value)
                .query_async::<_, ()>(&mut conn),
        )
        .await
    }

    async fn hash_get_all(&self, table: &str) -> CacheResult<HashMap<String, String>> {
        let mut conn = self.handle().await?;
        self.run(
            "HGETALL",
            redis::cmd("HGETALL")
                .arg(table)
                .query_async::<_, HashMap<String, String>>(&mut conn),
        )
        .await
    }

    async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.handle().await?;
        let reply: String = self
            .run("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        debug!(reply = %reply, "Redis ping");
        Ok(())
    }

    async fn close(&self) {
        let mut connection = self.connection.lock().await;
        if matches!(*connection, Connection::Ready(_)) {
            info!("Redis connection closed");
        }
        *connection = Connection::Closed;
    }
}
