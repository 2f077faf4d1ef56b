//! Live subscriber set and snapshot broadcast.
//!
//! Each connected client registers the sending half of its outbound frame
//! queue; the read loop that owns the connection is the only thing that
//! unregisters it. Broadcast failures are isolated per connection and never
//! tear anything down.

use crate::{error::FeedError, snapshot::Snapshot};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, warn};

/// Handle for one registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// Outbound channel to one connected client, carrying serialised frames.
pub type SubscriberSender = mpsc::UnboundedSender<String>;

/// Tracks connected clients and delivers snapshots to each of them.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    connections: Mutex<HashMap<ConnectionId, SubscriberSender>>,
    next_id: AtomicU64,
    joined: Notify,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound channel and wake anything parked on
    /// [`wait_for_subscriber`](Self::wait_for_subscriber).
    pub fn register(&self, sender: SubscriberSender) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.connections.lock().insert(id, sender);
        self.joined.notify_waiters();
        debug!(id = id.0, "subscriber registered");
        id
    }

    /// Remove a connection after its read loop terminated.
    pub fn unregister(&self, id: ConnectionId) {
        self.connections.lock().remove(&id);
        debug!(id = id.0, "subscriber unregistered");
    }

    /// Number of currently connected clients.
    pub fn subscriber_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Deliver the full snapshot to every registered connection.
    ///
    /// The frame is serialised once. A failed delivery is logged and does
    /// not affect the other connections, nor does it unregister the broken
    /// one: that stays the read loop's job. Returns the delivered count.
    pub fn broadcast(&self, snapshot: &Snapshot) -> usize {
        let frame = match serde_json::to_string(snapshot) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(%error, "failed to serialise snapshot for broadcast");
                return 0;
            }
        };

        let connections = self.connections.lock();
        let mut delivered = 0;
        for (id, sender) in connections.iter() {
            match sender.send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(error) => {
                    let error = FeedError::ClientDisconnected(error.to_string());
                    warn!(id = id.0, %error, "failed to queue snapshot for subscriber");
                }
            }
        }
        delivered
    }

    /// Park until at least one subscriber is registered.
    ///
    /// Notification-based replacement for fixed-interval polling: interest
    /// is enabled before the count check so a registration landing in
    /// between still wakes us.
    pub async fn wait_for_subscriber(&self) {
        loop {
            let notified = self.joined.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.subscriber_count() > 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::CoinState;
    use smol_str::SmolStr;
    use std::time::Duration;

    fn snapshot_with_btc() -> Snapshot {
        Snapshot::from([(
            SmolStr::new("BTC"),
            CoinState {
                price: "97000.0".to_string(),
                volume: "12.0".to_string(),
                change_24h: "0.4".to_string(),
                history: vec![1.0],
                interval: SmolStr::new("5m"),
            },
        )])
    }

    #[tokio::test]
    async fn test_broadcast_failure_is_isolated() {
        let registry = SubscriberRegistry::new();

        let (alive_tx, mut alive_rx) = mpsc::unbounded_channel();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        registry.register(alive_tx);
        let dead_id = registry.register(dead_tx);
        drop(dead_rx);

        let delivered = registry.broadcast(&snapshot_with_btc());

        assert_eq!(delivered, 1);
        let frame = alive_rx.recv().await.expect("live subscriber got the frame");
        assert!(frame.contains("\"BTC\""));
        // The broken connection is still registered until its read loop says otherwise.
        assert_eq!(registry.subscriber_count(), 2);
        registry.unregister(dead_id);
        assert_eq!(registry.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_subscriber_parks_until_register() {
        let registry = std::sync::Arc::new(SubscriberRegistry::new());

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.wait_for_subscriber().await })
        };

        // No subscriber yet: the waiter must still be parked.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register(tx);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke after registration")
            .expect("waiter task did not panic");
    }

    #[tokio::test]
    async fn test_wait_for_subscriber_returns_immediately_when_present() {
        let registry = SubscriberRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.register(tx);

        tokio::time::timeout(Duration::from_millis(100), registry.wait_for_subscriber())
            .await
            .expect("no parking needed with a live subscriber");
    }
}
