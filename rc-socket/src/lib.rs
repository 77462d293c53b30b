//! RecipeChat Socket - real-time support chat connection.
//!
//! This crate provides the chat connection manager that handles:
//! - One WebSocket session per authenticated user
//! - Automatic reconnection with capped exponential backoff
//! - Normalization of loosely-structured inbound frames
//! - Connection state and message broadcast via tokio channels
//! - Following the authentication token through [`AuthBinding`]

pub mod auth;
pub mod endpoint;
pub mod events;
pub mod manager;
pub mod message;
mod session;
pub mod transport;

// Re-export key types
pub use auth::{AuthBinding, AuthState};
pub use endpoint::ChatEndpoint;
pub use events::{ConnectionState, MessageStream};
pub use manager::{ConnectionManager, ReconnectConfig};
pub use message::{
    normalize_value, parse_frame, ChatRequest, FrameError, InboundMessage, MessageKind,
    OutboundMessage,
};
pub use transport::{Connector, Transport, TransportEvent, TransportEvents, WsConnector};
