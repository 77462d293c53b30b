//! Chat endpoint URI construction.

use url::Url;

use rc_core::config::{AppConfig, ChatConfig, ServerConfig};
use rc_core::constants::TOKEN_QUERY_PARAM;
use rc_core::error::{RcError, RcResult};

/// The real-time chat endpoint, without credentials.
///
/// Built from the backend's HTTP base address by switching to the matching
/// real-time scheme (`http` -> `ws`, `https` -> `wss`) and appending the chat
/// path. The token is added per connection by [`uri_for`](Self::uri_for).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEndpoint {
    base: Url,
}

impl ChatEndpoint {
    /// Build the endpoint from a base address and chat path.
    pub fn new(base_address: &str, ws_path: &str) -> RcResult<Self> {
        let sanitized = AppConfig::sanitize_server_address(base_address);
        if sanitized.is_empty() {
            return Err(RcError::MissingConfig("server address".into()));
        }

        let mut url = Url::parse(&sanitized)
            .map_err(|e| RcError::InvalidEndpoint(format!("{sanitized}: {e}")))?;

        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => {
                return Err(RcError::InvalidEndpoint(format!(
                    "unsupported scheme {other:?}"
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| RcError::InvalidEndpoint(format!("cannot use scheme {scheme}")))?;

        let path = if ws_path.starts_with('/') {
            ws_path.to_string()
        } else {
            format!("/{ws_path}")
        };
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);

        Ok(Self { base: url })
    }

    /// Build the endpoint from configuration sections.
    pub fn from_config(server: &ServerConfig, chat: &ChatConfig) -> RcResult<Self> {
        Self::new(&server.address, &chat.ws_path)
    }

    /// The connection URI for one session, with the token as a query parameter.
    pub fn uri_for(&self, token: &str) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair(TOKEN_QUERY_PARAM, token);
        url
    }

    /// The endpoint without credentials, safe to log.
    pub fn base(&self) -> &Url {
        &self.base
    }
}

impl std::fmt::Display for ChatEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base)
    }
}
