//! Snapshot of the latest-quote table
//!
//! Turns the raw `HGETALL` result into the `snapshot` frame a subscriber
//! receives on connect. Fields that no longer parse are skipped rather than
//! failing the whole snapshot.

use std::collections::HashMap;

use tracing::warn;
use types::feed::FeedMessage;
use types::quote::LatestQuote;

/// Decoded latest-quote table.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteTable {
    pub quotes: Vec<LatestQuote>,
    /// Fields skipped because their text was not a `LatestQuote`.
    pub skipped: usize,
}

impl QuoteTable {
    /// Decode the raw hash fields, ordered by symbol.
    pub fn from_fields(fields: HashMap<String, String>) -> Self {
        let mut quotes = Vec::with_capacity(fields.len());
        let mut skipped = 0;

        for (field, text) in fields {
            match serde_json::from_str::<LatestQuote>(&text) {
                Ok(quote) => quotes.push(quote),
                Err(e) => {
                    skipped += 1;
                    warn!(field = %field, error = %e, "Skipping unreadable latest quote");
                }
            }
        }

        quotes.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Self { quotes, skipped }
    }

    pub fn empty() -> Self {
        Self {
            quotes: Vec::new(),
            skipped: 0,
        }
    }

    pub fn into_message(self) -> FeedMessage {
        FeedMessage::snapshot(self.quotes)
    }
}
