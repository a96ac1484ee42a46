//! Types library for the trading dashboard backend
//!
//! Wire types shared by the cache, the live feed and the HTTP gateway.
//! Everything here serializes to the JSON the dashboard front end reads.
//!
//! # Modules
//! - `ids`: Identifiers (Symbol, SubscriberId)
//! - `quote`: Upstream ticks and the per-symbol latest-quote projection
//! - `feed`: Outbound feed frames and inbound subscriber control messages
//! - `errors`: Error taxonomy for parsing wire input

// Public modules
pub mod ids;
pub mod quote;
pub mod feed;
pub mod errors;
