//! CLI command implementations.

pub mod chat;
pub mod history;
pub mod login;
pub mod status;

use rc_api::ApiClient;
use rc_core::config::ConfigHandle;
use rc_core::error::{RcError, RcResult};
use rc_core::token_store::TokenStore;

/// Helper to create an API client from config.
pub async fn create_api_client(config: &ConfigHandle) -> RcResult<ApiClient> {
    let cfg = config.read().await;
    if !cfg.is_server_configured() {
        return Err(RcError::MissingConfig("server address".into()));
    }
    ApiClient::from_config(&cfg)
}

/// Load the stored access token, failing if the user is not signed in.
pub fn require_token() -> RcResult<String> {
    TokenStore::default_location()?
        .load()?
        .ok_or(RcError::AuthUnavailable)
}

/// Map a prompt failure into the workspace error type.
pub fn prompt_error(e: dialoguer::Error) -> RcError {
    RcError::Internal(format!("prompt failed: {e}"))
}

/// Truncate a string to a maximum number of characters, appending an
/// ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

/// Render an ISO timestamp as local `HH:MM`, or the raw value if unparseable.
pub fn short_time(timestamp: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(&chrono::Local).format("%H:%M").to_string())
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|dt| dt.format("%H:%M").to_string())
        })
        .unwrap_or_else(|_| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer line of text", 10), "a longe...");
        assert_eq!(truncate("crème brûlée", 8), "crème...");
    }

    #[test]
    fn test_short_time_naive() {
        assert_eq!(short_time("2024-01-01T09:05:00"), "09:05");
        assert_eq!(short_time("garbage"), "garbage");
    }
}
