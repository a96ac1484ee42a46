//! Identifier types for dashboard entities
//!
//! Symbols are normalized to upper case so `reliance` and `RELIANCE` address
//! the same cache key and the same latest-quote field.

use crate::errors::SymbolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Ticker symbol of a tradable instrument (e.g. "RELIANCE", "BTC/USDT")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Create a Symbol, normalizing to upper case
    ///
    /// Rejects empty input and any whitespace or control character.
    pub fn new(symbol: impl AsRef<str>) -> Result<Self, SymbolError> {
        let raw = symbol.as_ref().trim();
        if raw.is_empty() {
            return Err(SymbolError::Empty);
        }
        if let Some(ch) = raw.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(SymbolError::InvalidCharacter {
                symbol: raw.to_string(),
                ch,
            });
        }
        Ok(Self(raw.to_uppercase()))
    }

    /// Get the symbol string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = SymbolError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Process-local identifier of a live feed subscriber
///
/// Never persisted; a reconnecting client gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(u64);

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

impl SubscriberId {
    /// Allocate the next id for this process
    pub fn next() -> Self {
        Self(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}
