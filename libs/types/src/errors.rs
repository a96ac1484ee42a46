//! Error types for wire input
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Symbol validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SymbolError {
    #[error("Symbol is empty")]
    Empty,

    #[error("Symbol contains invalid character {ch:?}: {symbol}")]
    InvalidCharacter { symbol: String, ch: char },
}

/// Errors decoding a frame received from a subscriber or the upstream feed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MessageError {
    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Unsupported message type: {kind}")]
    UnsupportedType { kind: String },

    #[error("Invalid symbol: {0}")]
    Symbol(#[from] SymbolError),
}

impl From<serde_json::Error> for MessageError {
    fn from(err: serde_json::Error) -> Self {
        MessageError::Malformed(err.to_string())
    }
}
