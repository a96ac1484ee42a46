//! Live feed publisher
//!
//! For every tick, in the order ticks arrive:
//! 1. derive display fields (pure function of the tick)
//! 2. overwrite the symbol's field in the latest-quote table
//! 3. broadcast one `trade` frame to every open subscriber
//!
//! A failed table write is logged and the broadcast still goes out.

use std::sync::Arc;

use cache::SharedRemoteStore;
use tracing::{debug, warn};
use types::feed::FeedMessage;
use types::quote::{LatestQuote, Tick};

use crate::metrics::FeedMetrics;
use crate::snapshot::QuoteTable;
use crate::websocket::{BroadcastReport, Frame, SubscriberRegistry, Subscription};

pub struct FeedPublisher {
    store: SharedRemoteStore,
    registry: Arc<SubscriberRegistry>,
    metrics: Arc<FeedMetrics>,
    table: String,
}

impl FeedPublisher {
    pub fn new(
        store: SharedRemoteStore,
        registry: Arc<SubscriberRegistry>,
        metrics: Arc<FeedMetrics>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            store,
            registry,
            metrics,
            table: table.into(),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<FeedMetrics> {
        &self.metrics
    }

    /// Record `tick` as the symbol's latest quote and broadcast it.
    pub async fn publish(&self, tick: &Tick) -> BroadcastReport {
        self.metrics.record_tick();
        self.store_latest(tick).await;

        let message = FeedMessage::trade(tick);
        let frame: Frame = match message.to_json() {
            Ok(text) => Arc::from(text),
            Err(e) => {
                warn!(symbol = %tick.symbol, error = %e, "Could not encode trade frame");
                return BroadcastReport::default();
            }
        };

        let report = self.registry.broadcast(frame);
        self.metrics.record_broadcast(&report);
        debug!(
            symbol = %tick.symbol,
            price = %tick.price,
            delivered = report.delivered,
            dropped = report.dropped,
            "Tick broadcast"
        );
        report
    }

    /// Current latest-quote table. An unreachable store yields an empty table.
    pub async fn latest_quotes(&self) -> QuoteTable {
        match self.store.hash_get_all(&self.table).await {
            Ok(fields) => QuoteTable::from_fields(fields),
            Err(e) => {
                self.metrics.record_store_failure();
                warn!(table = %self.table, error = %e, "Latest quote table unavailable");
                QuoteTable::empty()
            }
        }
    }

    /// Connect a new subscriber. Its first frame is the current snapshot.
    ///
    /// The subscriber is registered before the table is read, so a tick
    /// published in between is delivered after the snapshot rather than lost.
    pub async fn subscribe(&self) -> Subscription {
        let subscription = self.registry.register();
        let snapshot = self.latest_quotes().await.into_message();

        match snapshot.to_json() {
            Ok(text) => subscription.with_snapshot(Arc::from(text)),
            Err(e) => {
                warn!(subscriber = %subscription.id(), error = %e, "Could not encode snapshot");
                subscription
            }
        }
    }

    async fn store_latest(&self, tick: &Tick) {
        let quote = LatestQuote::from(tick);
        let text = match serde_json::to_string(&quote) {
            Ok(text) => text,
            Err(e) => {
                warn!(symbol = %tick.symbol, error = %e, "Could not encode latest quote");
                return;
            }
        };

        if let Err(e) = self
            .store
            .hash_set(&self.table, tick.symbol.as_str(), &text)
            .await
        {
            self.metrics.record_store_failure();
            warn!(symbol = %tick.symbol, error = %e, "Latest quote write failed");
        }
    }
}
