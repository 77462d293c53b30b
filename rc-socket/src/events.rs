//! Connection state and the observable inbound message stream.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::message::InboundMessage;

/// Connection state for the connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Not connected. Initial state, and the state after a manual disconnect
    /// or while a reconnect is pending.
    #[default]
    Disconnected,
    /// A transport is being opened.
    Connecting,
    /// Connected and receiving messages.
    Connected,
    /// Transport error, missing token, or reconnect budget exhausted.
    Error,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Append-only log of inbound messages plus a live broadcast of new arrivals.
///
/// Messages are kept in arrival order. Duplicates are not filtered: a frame
/// delivered twice appears twice.
#[derive(Clone)]
pub struct MessageStream {
    sender: broadcast::Sender<InboundMessage>,
    log: Arc<Mutex<Vec<InboundMessage>>>,
}

impl MessageStream {
    /// Create a new stream with the given live channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Subscribe to messages appended from now on.
    ///
    /// Slow consumers that fall behind receive `RecvError::Lagged`; the full
    /// log stays available through [`snapshot`](Self::snapshot).
    pub fn subscribe(&self) -> broadcast::Receiver<InboundMessage> {
        self.sender.subscribe()
    }

    /// Append a message and notify live subscribers.
    pub async fn push(&self, message: InboundMessage) {
        self.log.lock().await.push(message.clone());
        match self.sender.send(message) {
            Ok(count) => debug!("delivered message to {count} subscriber(s)"),
            // No live subscribers; the message is still in the log.
            Err(_) => debug!("no subscribers for message"),
        }
    }

    /// Insert history ahead of everything received live so far.
    ///
    /// Returns the number of seeded messages.
    pub async fn seed(&self, history: Vec<InboundMessage>) -> usize {
        let count = history.len();
        let mut log = self.log.lock().await;
        log.splice(0..0, history);
        count
    }

    /// Copy of the full log in arrival order.
    pub async fn snapshot(&self) -> Vec<InboundMessage> {
        self.log.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.log.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.log.lock().await.is_empty()
    }

    /// Get the current number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    fn msg(id: i64, text: &str) -> InboundMessage {
        InboundMessage {
            id,
            text: text.into(),
            sender_email: "a@b.com".into(),
            sender_username: "A".into(),
            timestamp: "2024-01-01T00:00:00Z".into(),
            message_type: MessageKind::Text,
        }
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Error.to_string(), "error");
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connection_state_serde() {
        let json = serde_json::to_string(&ConnectionState::Connecting).unwrap();
        assert_eq!(json, "\"connecting\"");
    }

    #[tokio::test]
    async fn test_push_delivers_and_logs() {
        let stream = MessageStream::new(8);
        let mut rx = stream.subscribe();

        stream.push(msg(1, "one")).await;
        assert_eq!(rx.recv().await.unwrap().text, "one");
        assert_eq!(stream.len().await, 1);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept_in_order() {
        let stream = MessageStream::new(8);
        stream.push(msg(1, "a")).await;
        stream.push(msg(1, "a")).await;
        stream.push(msg(2, "b")).await;

        let texts: Vec<_> = stream.snapshot().await.into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["a", "a", "b"]);
    }

    #[tokio::test]
    async fn test_seed_goes_before_live_messages() {
        let stream = MessageStream::new(8);
        stream.push(msg(3, "live")).await;
        let seeded = stream.seed(vec![msg(1, "old"), msg(2, "older")]).await;

        assert_eq!(seeded, 2);
        let ids: Vec<_> = stream.snapshot().await.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_push_without_subscribers_still_logs() {
        let stream = MessageStream::new(1);
        assert_eq!(stream.subscriber_count(), 0);
        stream.push(msg(1, "x")).await;
        assert!(!stream.is_empty().await);
    }
}
