use axum::{extract::State, Json};
use cache::CacheStats;
use market_data::ingestion::FeedState;
use market_data::metrics::FeedMetricsSnapshot;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub remote_store: &'static str,
    pub subscribers: usize,
    /// `None` when no upstream feed is configured.
    pub feed_state: Option<FeedState>,
    pub cache: CacheStats,
    pub feed: FeedMetricsSnapshot,
}

/// Liveness plus a view of both cache tiers and the live feed.
///
/// Always 200: a down remote store degrades service but does not stop it.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let remote_up = match state.cache.remote().ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Remote store ping failed");
            false
        }
    };

    Json(HealthResponse {
        status: if remote_up { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        remote_store: if remote_up { "up" } else { "down" },
        subscribers: state.publisher.registry().active_count(),
        feed_state: state.feed_state.as_ref().map(|rx| *rx.borrow()),
        cache: state.cache.stats(),
        feed: state.publisher.metrics().snapshot(),
    })
}
