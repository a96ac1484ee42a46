//! Upstream ticks and the latest-quote projection
//!
//! A `Tick` is one trade print from the upstream stream. `LatestQuote` is the
//! last-write-wins record kept per symbol in the shared store; it is never a
//! time series and never merged.

use crate::ids::Symbol;
use chrono::DateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Price movement shown next to a quote on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Flat,
}

/// A single trade print received from the upstream feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: Symbol,
    pub price: Decimal,
    pub size: Decimal,
    /// Unix millis; upstream may also send an RFC 3339 string
    #[serde(deserialize_with = "timestamp_millis")]
    pub timestamp: i64,
    /// Reference close the upstream attaches for change display
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "prevClose")]
    pub prev_close: Option<Decimal>,
}

impl Tick {
    pub fn new(symbol: Symbol, price: Decimal, size: Decimal, timestamp: i64) -> Self {
        Self {
            symbol,
            price,
            size,
            timestamp,
            prev_close: None,
        }
    }

    /// Attach a reference close used to derive the direction
    pub fn with_prev_close(mut self, prev_close: Decimal) -> Self {
        self.prev_close = Some(prev_close);
        self
    }

    /// Up/down status of this tick, computed from the tick alone
    pub fn direction(&self) -> Direction {
        match self.prev_close {
            Some(reference) if self.price > reference => Direction::Up,
            Some(reference) if self.price < reference => Direction::Down,
            _ => Direction::Flat,
        }
    }
}

/// Per-symbol latest value held in the shared store's hash table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestQuote {
    pub symbol: Symbol,
    pub price: Decimal,
    pub size: Decimal,
    pub timestamp: i64,
}

impl From<&Tick> for LatestQuote {
    fn from(tick: &Tick) -> Self {
        Self {
            symbol: tick.symbol.clone(),
            price: tick.price,
            size: tick.size,
            timestamp: tick.timestamp,
        }
    }
}

fn timestamp_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Millis(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Millis(ms) => Ok(ms),
        Raw::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.timestamp_millis())
            .map_err(serde::de::Error::custom),
    }
}
