use thiserror::Error;

/// Upstream feed failures. None of these are fatal: the ingestion loop
/// logs them and reconnects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("failed to connect to upstream feed: {0}")]
    Connect(String),

    #[error("upstream stream error: {0}")]
    Stream(String),

    #[error("failed to send to upstream: {0}")]
    Send(String),
}
