//! Chat connection manager.
//!
//! Owns one logical session to the chat endpoint, reconnecting with
//! exponential backoff after abnormal closures, normalizing inbound frames
//! into [`InboundMessage`]s, and publishing its [`ConnectionState`].

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use rc_core::config::AppConfig;
use rc_core::constants::{self, close_code};
use rc_core::error::RcResult;

use crate::endpoint::ChatEndpoint;
use crate::events::{ConnectionState, MessageStream};
use crate::message::{self, InboundMessage, OutboundMessage};
use crate::session::Session;
use crate::transport::{Connector, TransportEvent, TransportEvents, WsConnector};

/// Configuration for socket reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect.
    pub base_delay: Duration,
    /// Maximum delay cap for exponential backoff.
    pub max_delay: Duration,
    /// Connection starts allowed without a successful open.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(constants::RECONNECT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(constants::RECONNECT_MAX_DELAY_MS),
            max_attempts: constants::MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl ReconnectConfig {
    /// Backoff delay before the reconnect that follows the `attempt`-th
    /// consecutive failure (1-indexed).
    ///
    /// Sequence with defaults: 1s, 2s, 4s, 8s, 16s, capped at 30s.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let base_ms = self.base_delay.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as u64))
    }
}

impl From<&rc_core::config::ChatConfig> for ReconnectConfig {
    fn from(chat: &rc_core::config::ChatConfig) -> Self {
        Self {
            base_delay: chat.reconnect_base_delay(),
            max_delay: chat.reconnect_max_delay(),
            max_attempts: chat.max_reconnect_attempts,
        }
    }
}

struct Inner {
    session: Option<Session>,
    /// Connection starts since the last successful open.
    attempts: u32,
    /// Abnormal closures since the last successful open.
    failures: u32,
    next_session_id: u64,
}

struct Shared {
    endpoint: ChatEndpoint,
    connector: Arc<dyn Connector>,
    reconnect_config: ReconnectConfig,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ConnectionState>,
    stream: MessageStream,
}

/// Support chat connection manager.
///
/// Cheap to clone; all clones drive the same session. All transitions are
/// serialized through one lock, so the state observed right after any
/// operation or transport event is the post-transition state.
///
/// Lifecycle:
/// - `connect(token)` tears down any existing session and opens a new one
/// - only a successful open resets the attempt and failure counters
/// - the n-th abnormal close in a row schedules a reconnect after
///   `min(base * 2^(n-1), max)`; the `max_attempts`-th one sets `Error`
///   instead
/// - `disconnect()` cancels any pending reconnect and closes normally
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    /// Create a manager with default reconnect policy.
    pub fn new(endpoint: ChatEndpoint, connector: Arc<dyn Connector>) -> Self {
        Self::with_config(
            endpoint,
            connector,
            ReconnectConfig::default(),
            constants::MESSAGE_CHANNEL_CAPACITY,
        )
    }

    /// Create a manager with an explicit reconnect policy and live channel capacity.
    pub fn with_config(
        endpoint: ChatEndpoint,
        connector: Arc<dyn Connector>,
        reconnect_config: ReconnectConfig,
        message_capacity: usize,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                endpoint,
                connector,
                reconnect_config,
                inner: Mutex::new(Inner {
                    session: None,
                    attempts: 0,
                    failures: 0,
                    next_session_id: 0,
                }),
                state_tx,
                stream: MessageStream::new(message_capacity),
            }),
        }
    }

    /// Create a WebSocket-backed manager from application configuration.
    pub fn from_config(config: &AppConfig) -> RcResult<Self> {
        let endpoint = ChatEndpoint::from_config(&config.server, &config.chat)?;
        Ok(Self::with_config(
            endpoint,
            Arc::new(WsConnector),
            ReconnectConfig::from(&config.chat),
            config.chat.message_channel_capacity,
        ))
    }

    /// Subscribe to connection state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Subscribe to messages arriving from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundMessage> {
        self.shared.stream.subscribe()
    }

    /// All messages so far, history first, then live arrivals in order.
    pub async fn messages(&self) -> Vec<InboundMessage> {
        self.shared.stream.snapshot().await
    }

    /// The underlying message stream.
    pub fn message_stream(&self) -> &MessageStream {
        &self.shared.stream
    }

    /// Seed the stream with previously fetched history.
    pub async fn seed_history(&self, history: Vec<InboundMessage>) -> usize {
        let count = self.shared.stream.seed(history).await;
        info!("seeded {count} historical message(s)");
        count
    }

    /// The chat endpoint, without credentials.
    pub fn endpoint(&self) -> &ChatEndpoint {
        &self.shared.endpoint
    }

    pub fn reconnect_config(&self) -> &ReconnectConfig {
        &self.shared.reconnect_config
    }

    /// Connection starts since the last successful open.
    pub async fn reconnect_attempts(&self) -> u32 {
        self.shared.inner.lock().await.attempts
    }

    /// Whether a reconnect timer is currently outstanding.
    pub async fn has_pending_reconnect(&self) -> bool {
        self.shared
            .inner
            .lock()
            .await
            .session
            .as_ref()
            .is_some_and(Session::has_pending_reconnect)
    }

    /// Update the connection state and notify watchers.
    fn set_state(&self, new_state: ConnectionState) {
        self.shared.state_tx.send_if_modified(|state| {
            if *state == new_state {
                return false;
            }
            info!("chat state: {} -> {}", *state, new_state);
            *state = new_state;
            true
        });
    }

    /// Open a new session with `token`.
    ///
    /// Any existing session is torn down first, including a pending
    /// reconnect. The reconnect budget carries over until a session opens.
    /// An empty token is refused and leaves the manager in `Error`.
    pub async fn connect(&self, token: &str) {
        let token = token.trim();
        let mut inner = self.shared.inner.lock().await;

        if token.is_empty() {
            warn!("no token available, refusing to connect");
            if let Some(session) = inner.session.take() {
                session.shutdown(close_code::NORMAL, "Not authenticated");
            }
            self.set_state(ConnectionState::Error);
            return;
        }

        self.start_session(&mut inner, token.to_string());
    }

    /// Reconnect with the token of the current session.
    ///
    /// After `disconnect()` there is no token to reuse; this then behaves
    /// like a connect without a token.
    pub async fn reconnect(&self) {
        let token = {
            let inner = self.shared.inner.lock().await;
            inner.session.as_ref().map(|s| s.token().to_string())
        };
        self.connect(token.as_deref().unwrap_or_default()).await;
    }

    /// Send a payload. Returns `false` unless connected and the transport
    /// accepted the frame. Nothing is queued.
    pub async fn send(&self, payload: impl Into<OutboundMessage>) -> bool {
        let payload = payload.into();
        let inner = self.shared.inner.lock().await;

        if !self.state().is_connected() {
            warn!("chat not connected ({}), cannot send message", self.state());
            return false;
        }
        let Some(session) = inner.session.as_ref() else {
            return false;
        };

        let frame = match payload.encode() {
            Ok(frame) => frame,
            Err(e) => {
                error!("failed to encode outbound message: {e}");
                return false;
            }
        };

        match session.transport().send_text(frame) {
            Ok(()) => {
                debug!("message sent on session {}", session.id());
                true
            }
            Err(e) => {
                error!("error sending message: {e}");
                false
            }
        }
    }

    /// Close the session and stop reconnecting. Safe to call repeatedly.
    pub async fn disconnect(&self) {
        let mut inner = self.shared.inner.lock().await;
        inner.attempts = self.shared.reconnect_config.max_attempts;
        inner.failures = self.shared.reconnect_config.max_attempts;
        if let Some(session) = inner.session.take() {
            session.shutdown(close_code::NORMAL, "Manual disconnect");
            info!("chat disconnected");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn start_session(&self, inner: &mut Inner, token: String) {
        if let Some(previous) = inner.session.take() {
            previous.shutdown(close_code::NORMAL, "Session replaced");
        }

        inner.attempts += 1;
        inner.next_session_id += 1;
        let session_id = inner.next_session_id;

        self.set_state(ConnectionState::Connecting);
        info!(
            "connecting to {} (attempt {}/{})",
            self.shared.endpoint, inner.attempts, self.shared.reconnect_config.max_attempts
        );

        let uri = self.shared.endpoint.uri_for(&token);
        match self.shared.connector.open(&uri) {
            Ok((transport, events)) => {
                inner.session = Some(Session::new(session_id, transport, token));
                self.spawn_event_pump(session_id, events);
            }
            Err(e) => {
                error!("error creating chat connection: {e}");
                self.set_state(ConnectionState::Error);
            }
        }
    }

    fn spawn_event_pump(&self, session_id: u64, mut events: TransportEvents) {
        let weak = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(manager) = Self::upgrade(&weak) else {
                    return;
                };
                manager.handle_transport_event(session_id, event).await;
            }
            debug!("event stream of session {session_id} ended");
        });
    }

    fn upgrade(weak: &Weak<Shared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    async fn handle_transport_event(&self, session_id: u64, event: TransportEvent) {
        let mut inner = self.shared.inner.lock().await;
        if inner.session.as_ref().map(Session::id) != Some(session_id) {
            debug!("ignoring {event:?} from stale session {session_id}");
            return;
        }

        match event {
            TransportEvent::Open => {
                inner.attempts = 0;
                inner.failures = 0;
                self.set_state(ConnectionState::Connected);
                info!("chat connected");
            }
            TransportEvent::Frame(raw) => match message::parse_frame(&raw) {
                Ok(message) => {
                    debug!("received message {} from {}", message.id, message.sender_email);
                    self.shared.stream.push(message).await;
                }
                Err(e) => warn!("dropping inbound frame ({e}): {raw}"),
            },
            TransportEvent::Error(e) => {
                warn!("chat transport error: {e}");
                self.set_state(ConnectionState::Error);
            }
            TransportEvent::Closed { code, reason } => {
                info!("chat connection closed: {code} {reason}");
                if let Some(session) = inner.session.as_mut() {
                    session.mark_closed();
                }

                let max_attempts = self.shared.reconnect_config.max_attempts;
                if code == close_code::NORMAL {
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }

                inner.failures = inner.failures.saturating_add(1);
                if inner.failures < max_attempts {
                    self.set_state(ConnectionState::Disconnected);
                    self.schedule_reconnect(&mut inner, session_id);
                } else {
                    error!("max reconnection attempts ({max_attempts}) reached");
                    self.set_state(ConnectionState::Error);
                }
            }
        }
    }

    fn schedule_reconnect(&self, inner: &mut Inner, session_id: u64) {
        let delay = self.shared.reconnect_config.delay_for_attempt(inner.failures);
        warn!(
            "reconnecting in {}ms (failure {}/{})",
            delay.as_millis(),
            inner.failures,
            self.shared.reconnect_config.max_attempts
        );

        let weak = Arc::downgrade(&self.shared);
        let timer = tokio::spawn(async move {
            sleep(delay).await;
            if let Some(manager) = Self::upgrade(&weak) {
                manager.reconnect_timer_fired(session_id).await;
            }
        });

        if let Some(session) = inner.session.as_mut() {
            session.set_reconnect_timer(timer);
        }
    }

    async fn reconnect_timer_fired(&self, session_id: u64) {
        let mut inner = self.shared.inner.lock().await;
        let token = match inner.session.as_mut() {
            Some(session) if session.id() == session_id => {
                session.detach_reconnect_timer();
                session.token().to_string()
            }
            _ => {
                debug!("ignoring reconnect timer of stale session {session_id}");
                return;
            }
        };

        info!("reconnecting");
        self.start_session(&mut inner, token);
    }
}
