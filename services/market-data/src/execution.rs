//! Inbound subscriber control messages
//!
//! The only request a subscriber can make is `execute-trade`, which is
//! forwarded to an external trade-execution collaborator. This module turns a
//! raw inbound frame into the reply frame for that subscriber.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use types::feed::{ClientMessage, FeedMessage, TradeAction};
use types::ids::Symbol;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("trade execution is not configured")]
    NotConfigured,

    #[error("trade rejected: {0}")]
    Rejected(String),

    #[error("execution service unavailable: {0}")]
    Unavailable(String),
}

/// External collaborator that places trades.
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    /// Returns a human-readable confirmation on success.
    async fn execute(&self, symbol: &Symbol, action: TradeAction) -> Result<String, ExecutionError>;
}

/// Executor used when no execution service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledExecutor;

#[async_trait]
impl TradeExecutor for DisabledExecutor {
    async fn execute(&self, _symbol: &Symbol, _action: TradeAction) -> Result<String, ExecutionError> {
        Err(ExecutionError::NotConfigured)
    }
}

/// Handle one inbound text frame and build the reply.
pub async fn handle_client_frame(text: &str, executor: &dyn TradeExecutor) -> FeedMessage {
    let message = match ClientMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Rejected subscriber message");
            return FeedMessage::Error {
                message: e.to_string(),
            };
        }
    };

    match message {
        ClientMessage::ExecuteTrade { symbol, action } => {
            match executor.execute(&symbol, action).await {
                Ok(confirmation) => {
                    info!(symbol = %symbol, action = ?action, "Trade forwarded");
                    FeedMessage::Execution {
                        symbol,
                        action,
                        accepted: true,
                        message: confirmation,
                    }
                }
                Err(e) => {
                    warn!(symbol = %symbol, action = ?action, error = %e, "Trade not executed");
                    FeedMessage::Execution {
                        symbol,
                        action,
                        accepted: false,
                        message: e.to_string(),
                    }
                }
            }
        }
    }
}
