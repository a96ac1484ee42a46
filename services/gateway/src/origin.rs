//! Market quote API client (origin for cached quote reads)

use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;
use types::ids::Symbol;

use crate::error::AppError;

/// Cache key for a symbol's quote.
pub fn quote_cache_key(symbol: &Symbol) -> String {
    format!("quotes:{}", symbol)
}

#[derive(Debug, Clone)]
pub struct QuoteOrigin {
    client: Client,
    base_url: String,
}

impl QuoteOrigin {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// GET `{base_url}/quotes/{SYMBOL}` and return the body unchanged.
    pub async fn fetch(&self, symbol: &Symbol) -> Result<Value, AppError> {
        let url = format!("{}/quotes/{}", self.base_url, symbol);
        debug!(%url, "Fetching quote from origin");

        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::ServiceUnavailable(format!("Quote service error: {}", e)))?;

        match res.status() {
            status if status.is_success() => res
                .json::<Value>()
                .await
                .map_err(|e| AppError::Upstream(format!("Invalid quote payload: {}", e))),
            StatusCode::NOT_FOUND => Err(AppError::NotFound(format!("No quote for {}", symbol))),
            status => Err(AppError::Upstream(format!(
                "Quote service returned {}",
                status
            ))),
        }
    }
}
