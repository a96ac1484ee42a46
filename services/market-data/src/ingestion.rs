//! Upstream feed ingestion
//!
//! Holds one WebSocket connection to the upstream trade stream, decodes
//! frames into ticks and hands them to the publisher in received order.
//!
//! Connection lifecycle: `Disconnected → Connected → ReceivingTicks`, back to
//! `Disconnected` on any drop, then a backoff delay and a fresh attempt.
//! Upstream failures are logged and retried; they never end the loop. Only
//! the shutdown signal does.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use types::quote::Tick;

use crate::error::FeedError;
use crate::publisher::FeedPublisher;
use crate::reconnect::BackoffPolicy;

/// Connection state of the upstream feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedState {
    Disconnected,
    Connected,
    ReceivingTicks,
}

/// Ticks decoded from one upstream text frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedFrame {
    pub ticks: Vec<Tick>,
    /// Elements that carried a `symbol` but did not decode as a tick.
    pub malformed: usize,
}

/// Decode one upstream frame.
///
/// A frame is a tick object or an array of them. Elements without a
/// `symbol` are control messages (auth acks, heartbeats) and are ignored.
pub fn decode_frame(text: &str) -> DecodedFrame {
    let mut decoded = DecodedFrame::default();

    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Upstream frame is not JSON");
            decoded.malformed = 1;
            return decoded;
        }
    };

    let elements = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    for element in elements {
        if element.get("symbol").is_none() {
            debug!(frame = %element, "Ignoring upstream control message");
            continue;
        }
        match serde_json::from_value::<Tick>(element) {
            Ok(tick) => decoded.ticks.push(tick),
            Err(e) => {
                decoded.malformed += 1;
                warn!(error = %e, "Dropping malformed upstream tick");
            }
        }
    }

    decoded
}

/// Configuration for the upstream connection.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// `ws://` or `wss://` URL of the trade stream.
    pub url: String,
    /// Text frame sent right after connecting (subscription request).
    pub subscribe_message: Option<String>,
    pub backoff: BackoffPolicy,
}

impl UpstreamConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            subscribe_message: None,
            backoff: BackoffPolicy::default(),
        }
    }
}

pub struct UpstreamFeed {
    config: UpstreamConfig,
    publisher: Arc<FeedPublisher>,
    state: watch::Sender<FeedState>,
}

impl UpstreamFeed {
    pub fn new(config: UpstreamConfig, publisher: Arc<FeedPublisher>) -> Self {
        let (state, _) = watch::channel(FeedState::Disconnected);
        Self {
            config,
            publisher,
            state,
        }
    }

    /// Observe connection state changes.
    pub fn state(&self) -> watch::Receiver<FeedState> {
        self.state.subscribe()
    }

    /// Run until `shutdown` flips to true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = self.config.backoff.start();
        info!(url = %self.config.url, "Upstream feed starting");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = tokio::select! {
                outcome = self.run_session() => outcome,
                _ = shutdown.changed() => break,
            };
            self.set_state(FeedState::Disconnected);

            match outcome {
                Ok(received) => {
                    if received > 0 {
                        backoff.reset();
                    }
                    info!(received, "Upstream feed closed");
                }
                Err(e) => warn!(error = %e, attempt = backoff.attempts() + 1, "Upstream feed dropped"),
            }

            let delay = backoff.next_delay();
            self.publisher.metrics().record_reconnect();
            debug!(delay_ms = delay.as_millis() as u64, "Reconnecting to upstream feed");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => break,
            }
        }

        self.set_state(FeedState::Disconnected);
        info!("Upstream feed stopped");
    }

    /// One connection: returns the number of ticks published.
    async fn run_session(&self) -> Result<u64, FeedError> {
        let (socket, _) = connect_async(self.config.url.as_str())
            .await
            .map_err(|e| FeedError::Connect(e.to_string()))?;
        self.set_state(FeedState::Connected);
        info!(url = %self.config.url, "Upstream feed connected");

        let (mut sink, mut stream) = socket.split();
        if let Some(subscribe) = &self.config.subscribe_message {
            sink.send(Message::Text(subscribe.clone()))
                .await
                .map_err(|e| FeedError::Send(e.to_string()))?;
        }

        let mut received: u64 = 0;
        while let Some(message) = stream.next().await {
            match message.map_err(|e| FeedError::Stream(e.to_string()))? {
                Message::Text(text) => {
                    let decoded = decode_frame(&text);
                    if decoded.malformed > 0 {
                        self.publisher
                            .metrics()
                            .record_malformed(decoded.malformed as u64);
                    }
                    for tick in decoded.ticks {
                        if received == 0 {
                            self.set_state(FeedState::ReceivingTicks);
                        }
                        received += 1;
                        self.publisher.publish(&tick).await;
                    }
                }
                Message::Close(frame) => {
                    debug!(frame = ?frame, "Upstream sent close");
                    break;
                }
                _ => {}
            }
        }

        Ok(received)
    }

    fn set_state(&self, next: FeedState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            debug!(from = ?*current, to = ?next, "Upstream feed state");
            *current = next;
            true
        });
    }
}
