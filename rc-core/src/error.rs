//! Global error types for the recipechat client.
//!
//! All error categories across the workspace are unified into a single
//! `RcError` enum with conversions from underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using RcError.
pub type RcResult<T> = Result<T, RcError>;

/// Unified error type covering all error categories in recipechat.
#[derive(Error, Debug)]
pub enum RcError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Network errors --
    /// HTTP request failed.
    #[error("http error: {0}")]
    Http(String),

    /// HTTP request timed out.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// The chat endpoint URI could not be built.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Server returned an error response.
    #[error("server error (status {status}): {message}")]
    ServerError {
        /// HTTP status code.
        status: u16,
        /// Error message from server.
        message: String,
    },

    // -- Auth errors --
    /// Authentication failed.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// No authentication token is available.
    #[error("not authenticated")]
    AuthUnavailable,

    // -- Message errors --
    /// Failed to hand a frame to the transport.
    #[error("send failed: {0}")]
    SendFailed(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for RcError {
    fn from(e: serde_json::Error) -> Self {
        RcError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for RcError {
    fn from(e: toml::de::Error) -> Self {
        RcError::Config(e.to_string())
    }
}

impl RcError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::ServerError { status, .. } => matches!(status, 502 | 503 | 504),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rc_error_display() {
        let err = RcError::Config("bad value".to_string());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn test_server_error_display() {
        let err = RcError::ServerError {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "server error (status 503): unavailable");
    }

    #[test]
    fn test_transient_classification() {
        assert!(RcError::Timeout("slow".into()).is_transient());
        assert!(RcError::ServerError { status: 502, message: String::new() }.is_transient());
        assert!(!RcError::ServerError { status: 500, message: String::new() }.is_transient());
        assert!(!RcError::AuthUnavailable.is_transient());
        assert!(!RcError::SendFailed("closed".into()).is_transient());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: RcError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, RcError::Serialization(_)));
    }
}
