//! One attempt-scoped connection: the transport handle, the token it was
//! opened with, and any pending reconnect timer.

use tokio::task::JoinHandle;
use tracing::debug;

use crate::transport::Transport;

pub(crate) struct Session {
    id: u64,
    transport: Box<dyn Transport>,
    token: String,
    reconnect_timer: Option<JoinHandle<()>>,
    closed: bool,
}

impl Session {
    pub(crate) fn new(id: u64, transport: Box<dyn Transport>, token: String) -> Self {
        Self {
            id,
            transport,
            token,
            reconnect_timer: None,
            closed: false,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Record that the transport reported its final close.
    pub(crate) fn mark_closed(&mut self) {
        self.closed = true;
    }

    pub(crate) fn has_pending_reconnect(&self) -> bool {
        self.reconnect_timer
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// Install a reconnect timer, cancelling any previous one.
    pub(crate) fn set_reconnect_timer(&mut self, timer: JoinHandle<()>) {
        if let Some(previous) = self.reconnect_timer.replace(timer) {
            previous.abort();
        }
    }

    /// Forget the timer without cancelling it. Used by the timer task
    /// itself, which must not abort its own handle.
    pub(crate) fn detach_reconnect_timer(&mut self) {
        self.reconnect_timer = None;
    }

    /// Cancel the timer and close the transport if it is still live.
    pub(crate) fn shutdown(mut self, code: u16, reason: &str) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
            debug!("cancelled pending reconnect of session {}", self.id);
        }
        if !self.closed {
            self.transport.close(code, reason);
        }
    }
}
