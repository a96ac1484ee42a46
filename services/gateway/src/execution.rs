//! Forwards subscriber execute-trade requests to the internal trading service

use async_trait::async_trait;
use market_data::execution::{ExecutionError, TradeExecutor};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use types::feed::TradeAction;
use types::ids::Symbol;

#[derive(Debug, Serialize)]
struct ExecuteTradeRequest<'a> {
    symbol: &'a Symbol,
    action: TradeAction,
}

#[derive(Debug, Default, Deserialize)]
struct ExecuteTradeResponse {
    #[serde(default)]
    message: Option<String>,
}

pub struct HttpTradeExecutor {
    client: Client,
    url: String,
}

impl HttpTradeExecutor {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl TradeExecutor for HttpTradeExecutor {
    async fn execute(&self, symbol: &Symbol, action: TradeAction) -> Result<String, ExecutionError> {
        let res = self
            .client
            .post(&self.url)
            .json(&ExecuteTradeRequest { symbol, action })
            .send()
            .await
            .map_err(|e| ExecutionError::Unavailable(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ExecutionError::Rejected(format!("{} {}", status, body.trim())));
        }

        // A body without a message is still an acceptance.
        let body: ExecuteTradeResponse = res.json().await.unwrap_or_default();
        Ok(body
            .message
            .unwrap_or_else(|| format!("{:?} order for {} accepted", action, symbol)))
    }
}
