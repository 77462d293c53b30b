//! Binding between the authentication token and the chat connection.
//!
//! The connection follows the token: it connects when a token appears,
//! reconnects when the token changes, and disconnects when it goes away.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::manager::ConnectionManager;

/// Shared holder of the current authentication token.
#[derive(Clone)]
pub struct AuthState {
    token: Arc<watch::Sender<Option<String>>>,
}

impl AuthState {
    pub fn new(initial: Option<String>) -> Self {
        let (tx, _) = watch::channel(normalize(initial));
        Self { token: Arc::new(tx) }
    }

    /// Replace the current token. Blank tokens count as logged out.
    pub fn set_token(&self, token: impl Into<String>) {
        self.replace(normalize(Some(token.into())));
    }

    /// Forget the token (logout or revocation).
    pub fn clear(&self) {
        self.replace(None);
    }

    pub fn token(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.token.subscribe()
    }

    fn replace(&self, next: Option<String>) {
        self.token.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new(None)
    }
}

fn normalize(token: Option<String>) -> Option<String> {
    token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Keeps a [`ConnectionManager`] in step with an [`AuthState`].
///
/// The binding runs on its own task until [`stop`](Self::stop) is called or
/// it is dropped. Dropping every [`AuthState`] clone disconnects the chat.
pub struct AuthBinding {
    task: JoinHandle<()>,
}

impl AuthBinding {
    /// Start following `auth`. The manager connects immediately with the
    /// current token, or enters `Error` when there is none.
    pub fn spawn(manager: ConnectionManager, auth: &AuthState) -> Self {
        let mut rx = auth.subscribe();
        let task = tokio::spawn(async move {
            let mut current = rx.borrow_and_update().clone();
            manager.connect(current.as_deref().unwrap_or_default()).await;

            while rx.changed().await.is_ok() {
                let next = rx.borrow_and_update().clone();
                if next == current {
                    continue;
                }
                match next.as_deref() {
                    Some(token) => {
                        info!("auth token changed, reconnecting chat");
                        manager.connect(token).await;
                    }
                    None => {
                        info!("auth token removed, disconnecting chat");
                        manager.disconnect().await;
                    }
                }
                current = next;
            }

            debug!("auth state dropped, disconnecting chat");
            manager.disconnect().await;
        });
        Self { task }
    }

    /// Stop following the auth state. The connection is left as is.
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for AuthBinding {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_is_logged_out() {
        let auth = AuthState::new(Some("   ".into()));
        assert!(!auth.is_authenticated());
        assert_eq!(auth.token(), None);
    }

    #[test]
    fn test_set_and_clear() {
        let auth = AuthState::default();
        auth.set_token(" abc ");
        assert_eq!(auth.token().as_deref(), Some("abc"));
        auth.clear();
        assert!(!auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_same_token_does_not_notify() {
        let auth = AuthState::new(Some("abc".into()));
        let mut rx = auth.subscribe();
        rx.borrow_and_update();

        auth.set_token("abc");
        assert!(!rx.has_changed().unwrap());

        auth.set_token("def");
        assert!(rx.has_changed().unwrap());
    }
}
