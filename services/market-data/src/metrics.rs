//! Observability for the live feed
//!
//! Counters are plain atomics updated on the hot path; `snapshot()` gives a
//! serializable view for the health endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::websocket::BroadcastReport;

/// Core metrics for the live feed.
#[derive(Debug, Default)]
pub struct FeedMetrics {
    // Ingestion
    pub ticks_received: AtomicU64,
    pub malformed_frames: AtomicU64,
    pub reconnects: AtomicU64,

    // Broadcasting
    pub frames_delivered: AtomicU64,
    pub frames_dropped: AtomicU64,
    pub subscribers_removed: AtomicU64,

    // Shared store
    pub store_failures: AtomicU64,
}

/// Serializable copy of `FeedMetrics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FeedMetricsSnapshot {
    pub ticks_received: u64,
    pub malformed_frames: u64,
    pub reconnects: u64,
    pub frames_delivered: u64,
    pub frames_dropped: u64,
    pub subscribers_removed: u64,
    pub store_failures: u64,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tick accepted from upstream.
    pub fn record_tick(&self) {
        self.ticks_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record frame elements that looked like ticks but failed to decode.
    pub fn record_malformed(&self, count: u64) {
        self.malformed_frames.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one broadcast.
    pub fn record_broadcast(&self, report: &BroadcastReport) {
        self.frames_delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.frames_dropped
            .fetch_add(report.dropped as u64, Ordering::Relaxed);
        self.subscribers_removed
            .fetch_add(report.removed as u64, Ordering::Relaxed);
    }

    /// Record a failed write or read against the latest-quote table.
    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FeedMetricsSnapshot {
        FeedMetricsSnapshot {
            ticks_received: self.ticks_received.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            subscribers_removed: self.subscribers_removed.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }
}
