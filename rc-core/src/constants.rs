//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "recipechat";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default server API timeout in milliseconds.
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;

/// Path of the real-time chat endpoint.
pub const CHAT_WS_PATH: &str = "/ws/chat";

/// Path of the chat history endpoint.
pub const CHAT_HISTORY_PATH: &str = "/api/chat/messages";

/// Query parameter carrying the auth token on the chat endpoint.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Maximum consecutive connection starts without a successful open.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// First reconnect delay in milliseconds.
pub const RECONNECT_BASE_DELAY_MS: u64 = 1_000;

/// Reconnect delay cap in milliseconds.
pub const RECONNECT_MAX_DELAY_MS: u64 = 30_000;

/// Capacity of the live inbound message broadcast channel.
pub const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// WebSocket close codes used by the chat client.
pub mod close_code {
    /// Normal closure, used for manual disconnects.
    pub const NORMAL: u16 = 1000;
    /// Close frame carried no status code.
    pub const NO_STATUS: u16 = 1005;
    /// Connection dropped without a close frame.
    pub const ABNORMAL: u16 = 1006;
}

/// Message kinds understood by the chat endpoint.
pub mod message_type {
    pub const TEXT: &str = "text";
    pub const PRIVATE: &str = "private";
}

/// Fallback values substituted into incomplete inbound messages.
pub mod fallback {
    pub const SENDER_EMAIL: &str = "unknown";
    pub const SENDER_USERNAME: &str = "Unknown";
}
