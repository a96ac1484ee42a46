//! Live feed wire protocol
//!
//! Outbound frames (`FeedMessage`) are JSON text sent to every dashboard
//! subscriber. Inbound frames (`ClientMessage`) are control requests a
//! subscriber may send back over the same socket.
//!
//! Flow: connect → one `snapshot` → `trade` per upstream tick.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::MessageError;
use crate::ids::Symbol;
use crate::quote::{Direction, LatestQuote, Tick};

/// Trade side requested by a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

/// Frames sent from the server to a subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FeedMessage {
    /// Full latest-quote table, sent once on connect
    Snapshot { data: BTreeMap<String, LatestQuote> },

    /// One upstream tick with its derived display fields
    Trade {
        symbol: Symbol,
        price: Decimal,
        size: Decimal,
        timestamp: i64,
        direction: Direction,
    },

    /// Outcome of an execute-trade request from this subscriber
    Execution {
        symbol: Symbol,
        action: TradeAction,
        accepted: bool,
        message: String,
    },

    /// A subscriber frame could not be handled
    Error { message: String },
}

impl FeedMessage {
    /// Build the per-tick broadcast frame
    pub fn trade(tick: &Tick) -> Self {
        FeedMessage::Trade {
            symbol: tick.symbol.clone(),
            price: tick.price,
            size: tick.size,
            timestamp: tick.timestamp,
            direction: tick.direction(),
        }
    }

    /// Build a snapshot frame from latest quotes
    pub fn snapshot(quotes: impl IntoIterator<Item = LatestQuote>) -> Self {
        let data = quotes
            .into_iter()
            .map(|quote| (quote.symbol.as_str().to_string(), quote))
            .collect();
        FeedMessage::Snapshot { data }
    }

    /// Label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            FeedMessage::Snapshot { .. } => "snapshot",
            FeedMessage::Trade { .. } => "trade",
            FeedMessage::Execution { .. } => "execution",
            FeedMessage::Error { .. } => "error",
        }
    }

    /// Serialize as a JSON text frame
    pub fn to_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Frames a subscriber may send to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Forwarded to the trade-execution collaborator
    ExecuteTrade { symbol: Symbol, action: TradeAction },
}

impl ClientMessage {
    /// Parse a raw text frame
    ///
    /// Distinguishes an unknown `type` from a malformed body so the server can
    /// answer with a precise error.
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let raw: serde_json::Value = serde_json::from_str(text)?;
        let kind = raw
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| MessageError::Malformed("missing \"type\" field".to_string()))?;

        match kind {
            "execute-trade" => Ok(serde_json::from_value(raw)?),
            other => Err(MessageError::UnsupportedType {
                kind: other.to_string(),
            }),
        }
    }
}
