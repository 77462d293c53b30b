//! Shared test utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rc_core::error::{RcError, RcResult};
use rc_socket::{
    ChatEndpoint, ConnectionManager, Connector, ReconnectConfig, Transport, TransportEvent,
    TransportEvents,
};
use tokio::sync::mpsc;
use url::Url;

/// Everything observable about one transport opened by [`MockConnector`].
#[derive(Clone)]
pub struct MockSession {
    pub uri: Url,
    events: mpsc::UnboundedSender<TransportEvent>,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<Option<(u16, String)>>>,
    fail_send: Arc<AtomicBool>,
}

impl MockSession {
    pub fn open(&self) {
        let _ = self.events.send(TransportEvent::Open);
    }

    pub fn frame(&self, raw: &str) {
        let _ = self.events.send(TransportEvent::Frame(raw.to_string()));
    }

    pub fn close(&self, code: u16) {
        let _ = self.events.send(TransportEvent::Closed {
            code,
            reason: String::new(),
        });
    }

    pub fn error(&self, message: &str) {
        let _ = self.events.send(TransportEvent::Error(message.to_string()));
    }

    /// Frames the manager handed to this transport.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Close code and reason the manager closed this transport with.
    pub fn closed_with(&self) -> Option<(u16, String)> {
        self.closed.lock().unwrap().clone()
    }

    pub fn fail_sends(&self) {
        self.fail_send.store(true, Ordering::SeqCst);
    }

    pub fn token(&self) -> Option<String> {
        self.uri
            .query_pairs()
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned())
    }
}

struct MockTransport {
    session: MockSession,
}

impl Transport for MockTransport {
    fn send_text(&self, frame: String) -> RcResult<()> {
        if self.session.fail_send.load(Ordering::SeqCst) {
            return Err(RcError::SendFailed("mock transport refused".into()));
        }
        self.session.sent.lock().unwrap().push(frame);
        Ok(())
    }

    fn close(&self, code: u16, reason: &str) {
        *self.session.closed.lock().unwrap() = Some((code, reason.to_string()));
        // Like a real socket, a requested close is reported back.
        let _ = self.session.events.send(TransportEvent::Closed {
            code,
            reason: reason.to_string(),
        });
    }
}

/// Connector that records every transport it opens and lets the test
/// drive their events by hand.
#[derive(Clone, Default)]
pub struct MockConnector {
    sessions: Arc<Mutex<Vec<MockSession>>>,
}

impl MockConnector {
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn session(&self, index: usize) -> MockSession {
        self.sessions.lock().unwrap()[index].clone()
    }

    pub fn last(&self) -> MockSession {
        self.sessions
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no session opened")
    }
}

impl Connector for MockConnector {
    fn open(&self, uri: &Url) -> RcResult<(Box<dyn Transport>, TransportEvents)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = MockSession {
            uri: uri.clone(),
            events: tx,
            sent: Arc::default(),
            closed: Arc::default(),
            fail_send: Arc::default(),
        };
        self.sessions.lock().unwrap().push(session.clone());
        Ok((Box::new(MockTransport { session }), rx))
    }
}

pub fn create_test_endpoint() -> ChatEndpoint {
    ChatEndpoint::new("http://localhost:8080", "/ws/chat").expect("valid endpoint")
}

/// Manager with the default reconnect policy over a fresh mock connector.
pub fn create_test_manager() -> (ConnectionManager, MockConnector) {
    let connector = MockConnector::default();
    let manager = ConnectionManager::with_config(
        create_test_endpoint(),
        Arc::new(connector.clone()),
        ReconnectConfig::default(),
        64,
    );
    (manager, connector)
}

/// Let spawned tasks run without advancing the paused clock.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock and let woken tasks run.
pub async fn advance(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}

/// Connect and open the first transport.
pub async fn connect_and_open(manager: &ConnectionManager, connector: &MockConnector) {
    manager.connect("test-token").await;
    connector.last().open();
    settle().await;
}
