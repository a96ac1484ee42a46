mod config;
mod error;
mod execution;
mod handlers;
mod origin;
mod router;
mod state;

use std::sync::Arc;

use anyhow::Context;
use cache::{RedisStore, SharedRemoteStore};
use config::GatewayConfig;
use market_data::ingestion::UpstreamFeed;
use router::create_router;
use state::AppState;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting Gateway API service");

    let config = GatewayConfig::from_env().context("invalid gateway configuration")?;

    if config.redis.tls_insecure {
        tracing::warn!("Redis TLS certificate verification is disabled");
    }
    tracing::info!(url = %config.redis.redacted_url(), "Connecting to Redis");
    // Only a malformed URL is fatal; an unreachable server leaves the cache origin-only.
    let remote: SharedRemoteStore = Arc::new(
        RedisStore::connect(&config.redis)
            .await
            .context("invalid Redis configuration")?,
    );

    let mut state = AppState::new(&config, remote)?;

    // Upstream feed runs until shutdown is signalled
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let feed_task = match config.feed.clone() {
        Some(feed_config) => {
            let feed = UpstreamFeed::new(feed_config, state.publisher.clone());
            state.feed_state = Some(feed.state());
            Some(tokio::spawn(feed.run(shutdown_rx)))
        }
        None => {
            tracing::warn!("FEED_URL not set; live feed disabled");
            None
        }
    };

    let app = create_router(state.clone());

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);
    if let Some(task) = feed_task {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Upstream feed task failed");
        }
    }
    state.cache.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
