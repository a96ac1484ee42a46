//! Market Data Service
//!
//! Ingests the upstream trade stream and produces:
//! - A last-write-wins latest-quote table in the shared store
//! - A `trade` frame per tick, fanned out to every live subscriber
//! - A `snapshot` frame for each newly connected subscriber
//!
//! # Architecture
//!
//! ```text
//!   Upstream WebSocket
//!          │
//!     ┌────▼────┐
//!     │ Ingest  │  ← decode frames, reconnect with backoff
//!     └────┬────┘
//!          │ Tick (in received order)
//!     ┌────▼──────┐        ┌──────────────────┐
//!     │ Publisher │──HSET─►│ latest_quotes    │
//!     └────┬──────┘        └────────┬─────────┘
//!          │ trade frame            │ HGETALL on connect
//!     ┌────▼───────────────────┐    │
//!     │ Subscriber Registry    │◄───┘ snapshot frame
//!     └────────────────────────┘
//! ```
//!
//! Delivery is at-most-once: a subscriber whose channel is full misses that
//! frame, and nothing is queued for subscribers that have gone away.

pub mod error;
pub mod execution;
pub mod ingestion;
pub mod metrics;
pub mod publisher;
pub mod reconnect;
pub mod snapshot;
pub mod websocket;

pub use error::FeedError;
pub use publisher::FeedPublisher;
pub use websocket::{SubscriberRegistry, Subscription};

/// Redis hash holding one `LatestQuote` per symbol.
pub const LATEST_QUOTES_TABLE: &str = "latest_quotes";

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
