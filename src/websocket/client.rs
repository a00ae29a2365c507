//! Connection Actor
//!
//! One [`Client`] exists per WebSocket connection. It owns the connection's
//! subscription set and the sending side of its bounded outbound queue. The
//! receiving side belongs to the write pump, so there is exactly one consumer.
//!
//! The outbound sender sits in a `Mutex<Option<_>>`. Closing takes the sender
//! out under the lock, which is the only transition from open to closed:
//! a concurrent `send` either enqueues before the close or sees `None`.

use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::subscriptions::Subscriptions;

/// Unique identifier for a connection
pub type ClientId = Uuid;

/// Default capacity of a client's outbound queue
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Per-connection actor state shared between the pumps and the hub
#[derive(Debug)]
pub struct Client {
    id: ClientId,
    /// Authenticated identity, empty for anonymous connections
    identity: String,
    subscriptions: RwLock<Subscriptions>,
    outbound: Mutex<Option<mpsc::Sender<String>>>,
}

impl Client {
    /// Create a client and the receiving end of its outbound queue
    pub fn new(identity: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let client = Self {
            id: Uuid::new_v4(),
            identity: identity.into(),
            subscriptions: RwLock::new(Subscriptions::new()),
            outbound: Mutex::new(Some(tx)),
        };
        (client, rx)
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_authenticated(&self) -> bool {
        !self.identity.is_empty()
    }

    /// Queue a payload for the write pump
    ///
    /// Best effort: dropped silently once the client is closed, and dropped
    /// with a warning when the queue is full.
    pub fn send(&self, payload: impl Into<String>) {
        let slot = self.outbound_slot();
        let Some(tx) = slot.as_ref() else {
            return;
        };

        match tx.try_send(payload.into()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(client_id = %self.id, "Outbound queue full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!(client_id = %self.id, "Write pump gone, dropping message");
            }
        }
    }

    /// Close the outbound queue
    ///
    /// The write pump drains what is already queued, then sends a close frame.
    /// Calling this more than once is harmless.
    pub fn close(&self) {
        if self.outbound_slot().take().is_some() {
            tracing::debug!(client_id = %self.id, "Outbound queue closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.outbound_slot().is_none()
    }

    /// Snapshot of all subscriptions, public first
    pub async fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.read().await.all()
    }

    pub async fn is_subscribed_public(&self, topic: &str) -> bool {
        self.subscriptions.read().await.has_public(topic)
    }

    pub async fn is_subscribed_private(&self, topic: &str) -> bool {
        self.subscriptions.read().await.has_private(topic)
    }

    pub async fn subscribe_public(&self, topic: &str) {
        self.subscriptions.write().await.subscribe_public(topic);
    }

    pub async fn subscribe_private(&self, topic: &str) {
        self.subscriptions.write().await.subscribe_private(topic);
    }

    pub async fn unsubscribe_public(&self, topic: &str) {
        self.subscriptions.write().await.unsubscribe_public(topic);
    }

    pub async fn unsubscribe_private(&self, topic: &str) {
        self.subscriptions.write().await.unsubscribe_private(topic);
    }

    fn outbound_slot(&self) -> MutexGuard<'_, Option<mpsc::Sender<String>>> {
        self.outbound
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_send_enqueues_in_order() {
        let (client, mut rx) = Client::new("", DEFAULT_OUTBOUND_CAPACITY);
        client.send("one");
        client.send(String::from("two"));

        assert_eq!(rx.recv().await.as_deref(), Some("one"));
        assert_eq!(rx.recv().await.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_send_after_close_is_dropped() {
        let (client, mut rx) = Client::new("uid-1", DEFAULT_OUTBOUND_CAPACITY);
        client.send("before");
        client.close();
        client.send("after");
        client.close();

        assert!(client.is_closed());
        assert_eq!(rx.recv().await.as_deref(), Some("before"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let (client, mut rx) = Client::new("", 2);
        client.send("a");
        client.send("b");
        client.send("c");
        client.close();

        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await.as_deref(), Some("b"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_concurrent_send_and_close() {
        let (client, mut rx) = Client::new("", DEFAULT_OUTBOUND_CAPACITY);
        let client = Arc::new(client);

        let mut handles = Vec::new();
        for i in 0..8 {
            let client = Arc::clone(&client);
            handles.push(tokio::spawn(async move {
                for j in 0..16 {
                    client.send(format!("{}-{}", i, j));
                }
            }));
        }
        let closer = Arc::clone(&client);
        handles.push(tokio::spawn(async move { closer.close() }));

        for handle in handles {
            handle.await.unwrap();
        }

        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert!(received <= 8 * 16);
        client.send("late");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_identity_and_subscriptions() {
        let (anon, _rx) = Client::new("", 4);
        assert!(!anon.is_authenticated());
        assert_eq!(anon.identity(), "");

        let (client, _rx) = Client::new("ID123", 4);
        assert!(client.is_authenticated());
        assert_eq!(client.identity(), "ID123");

        client.subscribe_private("order").await;
        client.subscribe_public("btcusd.trades").await;
        client.subscribe_public("btcusd.trades").await;
        assert_eq!(client.subscriptions().await, vec!["btcusd.trades", "order"]);
        assert!(client.is_subscribed_public("btcusd.trades").await);
        assert!(client.is_subscribed_private("order").await);

        client.unsubscribe_public("btcusd.trades").await;
        client.unsubscribe_private("missing").await;
        assert_eq!(client.subscriptions().await, vec!["order"]);
    }
}
