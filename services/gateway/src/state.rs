use std::sync::Arc;

use cache::{CacheError, ReadThroughCache, SharedRemoteStore};
use market_data::execution::{DisabledExecutor, TradeExecutor};
use market_data::ingestion::FeedState;
use market_data::metrics::FeedMetrics;
use market_data::{FeedPublisher, SubscriberRegistry, LATEST_QUOTES_TABLE};
use reqwest::Client;
use tokio::sync::watch;

use crate::config::GatewayConfig;
use crate::execution::HttpTradeExecutor;
use crate::origin::QuoteOrigin;

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<ReadThroughCache>,
    pub publisher: Arc<FeedPublisher>,
    pub quotes: QuoteOrigin,
    pub quote_ttl_secs: u64,
    pub executor: Arc<dyn TradeExecutor>,
    /// Present when an upstream feed is configured.
    pub feed_state: Option<watch::Receiver<FeedState>>,
}

impl AppState {
    /// Wire the cache, publisher and collaborators around one remote store.
    pub fn new(config: &GatewayConfig, remote: SharedRemoteStore) -> Result<Self, CacheError> {
        let http_client = Client::new();

        let cache = ReadThroughCache::new(remote.clone(), config.cache.clone())?;
        let publisher = FeedPublisher::new(
            remote,
            SubscriberRegistry::new(config.registry.clone()),
            Arc::new(FeedMetrics::new()),
            LATEST_QUOTES_TABLE,
        );

        let executor: Arc<dyn TradeExecutor> = match &config.trade_execution_url {
            Some(url) => Arc::new(HttpTradeExecutor::new(http_client.clone(), url.clone())),
            None => Arc::new(DisabledExecutor),
        };

        Ok(Self {
            cache: Arc::new(cache),
            publisher: Arc::new(publisher),
            quotes: QuoteOrigin::new(http_client, config.quote_api_url.clone()),
            quote_ttl_secs: config.quote_ttl_secs,
            executor,
            feed_state: None,
        })
    }
}
