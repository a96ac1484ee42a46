use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use types::ids::Symbol;
use types::quote::LatestQuote;

use crate::error::AppError;
use crate::origin::quote_cache_key;
use crate::state::AppState;

/// Quote for one symbol, read through the cache from the quote API.
pub async fn get_quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Value>, AppError> {
    let symbol = Symbol::new(&symbol)?;
    let key = quote_cache_key(&symbol);

    let quote = state
        .cache
        .get(&key, || state.quotes.fetch(&symbol), state.quote_ttl_secs)
        .await?;

    Ok(Json(Value::clone(&quote)))
}

/// Latest trade per symbol, as last written by the live feed.
pub async fn latest_quotes(State(state): State<AppState>) -> Json<BTreeMap<String, LatestQuote>> {
    let table = state.publisher.latest_quotes().await;
    Json(
        table
            .quotes
            .into_iter()
            .map(|quote| (quote.symbol.to_string(), quote))
            .collect(),
    )
}
