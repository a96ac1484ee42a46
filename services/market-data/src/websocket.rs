//! Subscriber registry for the live feed
//!
//! Every connected dashboard socket owns a `Subscription`: a bounded channel
//! the publisher pushes serialized frames into. The registry never waits on a
//! subscriber. A full channel loses that frame, a closed channel is removed on
//! the spot, and dropping a `Subscription` deregisters it immediately.
//!
//! Flow: register → snapshot frame → trade frames.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};
use types::ids::SubscriberId;

/// A serialized JSON text frame, shared by every recipient of a broadcast.
pub type Frame = Arc<str>;

/// Configuration for the subscriber registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Frames buffered per subscriber before new ones are dropped (default: 256).
    pub channel_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Outcome of one broadcast across all subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
    pub removed: usize,
}

/// Set of currently connected feed consumers.
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, mpsc::Sender<Frame>>,
    config: RegistryConfig,
}

impl SubscriberRegistry {
    pub fn new(config: RegistryConfig) -> Arc<Self> {
        Arc::new(Self {
            subscribers: DashMap::new(),
            config,
        })
    }

    /// Register a new subscriber and return its receiving end.
    pub fn register(self: &Arc<Self>) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.config.channel_capacity.max(1));
        let id = SubscriberId::next();
        self.subscribers.insert(id, sender);
        info!(subscriber = %id, active = self.subscribers.len(), "Subscriber connected");

        Subscription {
            id,
            pending_snapshot: None,
            receiver,
            registry: Arc::downgrade(self),
        }
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn deregister(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            info!(subscriber = %id, active = self.subscribers.len(), "Subscriber disconnected");
        }
        removed
    }

    /// Push `frame` to every open subscriber without waiting on any of them.
    pub fn broadcast(&self, frame: Frame) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut closed = Vec::new();

        for entry in self.subscribers.iter() {
            match entry.value().try_send(Arc::clone(&frame)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    report.dropped += 1;
                    debug!(subscriber = %entry.key(), "Subscriber lagging, frame dropped");
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }

        // Removal happens after iteration: DashMap shards are still read-locked above.
        for id in closed {
            if self.deregister(id) {
                report.removed += 1;
            }
        }

        report
    }

    /// Number of registered subscribers.
    pub fn active_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_registered(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    /// All registered subscriber ids.
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        let mut ids: Vec<SubscriberId> = self.subscribers.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }
}

/// Receiving end of one subscriber's feed.
///
/// Yields the snapshot (when one was attached) before any live frame.
pub struct Subscription {
    id: SubscriberId,
    pending_snapshot: Option<Frame>,
    receiver: mpsc::Receiver<Frame>,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Queue `frame` to be delivered before anything broadcast.
    pub fn with_snapshot(mut self, frame: Frame) -> Self {
        self.pending_snapshot = Some(frame);
        self
    }

    /// Next frame; `None` once the registry is gone.
    pub async fn recv(&mut self) -> Option<Frame> {
        if let Some(snapshot) = self.pending_snapshot.take() {
            return Some(snapshot);
        }
        self.receiver.recv().await
    }

    /// Next frame if one is ready.
    pub fn try_recv(&mut self) -> Option<Frame> {
        if let Some(snapshot) = self.pending_snapshot.take() {
            return Some(snapshot);
        }
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.deregister(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_registry() -> Arc<SubscriberRegistry> {
        SubscriberRegistry::new(RegistryConfig::default())
    }

    fn frame(text: &str) -> Frame {
        Arc::from(text)
    }

    #[test]
    fn test_subscriber_registration() {
        let reg = default_registry();
        let a = reg.register();
        let b = reg.register();

        assert_ne!(a.id(), b.id());
        assert_eq!(reg.active_count(), 2);
        assert_eq!(reg.subscriber_ids().len(), 2);
    }

    #[test]
    fn test_broadcast_reaches_everyone_in_order() {
        let reg = default_registry();
        let mut a = reg.register();
        let mut b = reg.register();

        reg.broadcast(frame("1"));
        let report = reg.broadcast(frame("2"));
        assert_eq!(report.delivered, 2);

        for sub in [&mut a, &mut b] {
            assert_eq!(sub.try_recv().as_deref(), Some("1"));
            assert_eq!(sub.try_recv().as_deref(), Some("2"));
            assert!(sub.try_recv().is_none());
        }
    }

    #[test]
    fn test_drop_deregisters() {
        let reg = default_registry();
        let a = reg.register();
        let id = a.id();
        assert!(reg.is_registered(id));

        drop(a);
        assert!(!reg.is_registered(id));
        assert_eq!(reg.active_count(), 0);
        assert_eq!(reg.broadcast(frame("x")), BroadcastReport::default());
    }

    #[test]
    fn test_full_channel_drops_without_blocking() {
        let reg = SubscriberRegistry::new(RegistryConfig {
            channel_capacity: 1,
        });
        let mut slow = reg.register();
        let mut fast = reg.register();

        reg.broadcast(frame("1"));
        assert_eq!(fast.try_recv().as_deref(), Some("1"));

        let report = reg.broadcast(frame("2"));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(fast.try_recv().as_deref(), Some("2"));

        // The slow subscriber only has the frame it had room for.
        assert_eq!(slow.try_recv().as_deref(), Some("1"));
        assert!(slow.try_recv().is_none());
        assert_eq!(reg.active_count(), 2);
    }

    #[test]
    fn test_snapshot_comes_first() {
        let reg = default_registry();
        let mut sub = reg.register().with_snapshot(frame("snapshot"));
        reg.broadcast(frame("trade"));

        assert_eq!(sub.try_recv().as_deref(), Some("snapshot"));
        assert_eq!(sub.try_recv().as_deref(), Some("trade"));
    }

    #[test]
    fn test_subscription_outliving_registry() {
        let reg = default_registry();
        let sub = reg.register();
        drop(reg);
        drop(sub);
    }
}
