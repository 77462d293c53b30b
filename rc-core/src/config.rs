//! Application configuration management.
//!
//! Handles loading, saving, and accessing application configuration including
//! the backend address, chat endpoint paths, and reconnection policy.
//! Configuration is persisted as TOML on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{RcError, RcResult};
use crate::platform::Platform;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend connection settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Support chat settings.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Backend base URL (e.g., "http://localhost:8080").
    #[serde(default = "default_address")]
    pub address: String,

    /// API request timeout in milliseconds.
    #[serde(default = "default_api_timeout")]
    pub api_timeout_ms: u64,

    /// Whether to accept self-signed TLS certificates from the backend.
    #[serde(default)]
    pub accept_self_signed_certs: bool,
}

/// Support chat configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Path of the real-time chat endpoint.
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Path of the message history endpoint.
    #[serde(default = "default_history_path")]
    pub history_path: String,

    /// Connection starts allowed without a successful open before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// First reconnect delay in milliseconds.
    #[serde(default = "default_reconnect_base_delay")]
    pub reconnect_base_delay_ms: u64,

    /// Reconnect delay cap in milliseconds.
    #[serde(default = "default_reconnect_max_delay")]
    pub reconnect_max_delay_ms: u64,

    /// Capacity of the live message broadcast channel.
    #[serde(default = "default_message_capacity")]
    pub message_channel_capacity: usize,

    /// Fetch message history once when the chat starts.
    #[serde(default = "default_true")]
    pub load_history: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

// Default value functions for serde

fn default_address() -> String {
    "http://localhost:8080".to_string()
}

fn default_api_timeout() -> u64 {
    constants::DEFAULT_API_TIMEOUT_MS
}

fn default_ws_path() -> String {
    constants::CHAT_WS_PATH.to_string()
}

fn default_history_path() -> String {
    constants::CHAT_HISTORY_PATH.to_string()
}

fn default_max_reconnect_attempts() -> u32 {
    constants::MAX_RECONNECT_ATTEMPTS
}

fn default_reconnect_base_delay() -> u64 {
    constants::RECONNECT_BASE_DELAY_MS
}

fn default_reconnect_max_delay() -> u64 {
    constants::RECONNECT_MAX_DELAY_MS
}

fn default_message_capacity() -> usize {
    constants::MESSAGE_CHANNEL_CAPACITY
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            api_timeout_ms: default_api_timeout(),
            accept_self_signed_certs: false,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            ws_path: default_ws_path(),
            history_path: default_history_path(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay(),
            reconnect_max_delay_ms: default_reconnect_max_delay(),
            message_channel_capacity: default_message_capacity(),
            load_history: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl ChatConfig {
    /// First reconnect delay.
    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }

    /// Reconnect delay cap.
    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }
}

impl AppConfig {
    /// Load configuration from the default config file path.
    pub fn load_default() -> RcResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> RcResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&contents)?;
        config.server.address = Self::sanitize_server_address(&config.server.address);
        Ok(config)
    }

    /// Save configuration to the default config file path.
    pub fn save_default(&self) -> RcResult<()> {
        let path = Self::default_config_path()?;
        self.save_to_file(&path)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> RcResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| RcError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> RcResult<PathBuf> {
        let config_dir = Platform::config_dir()?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get the effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> RcResult<PathBuf> {
        if self.logging.directory.is_empty() {
            let data_dir = Platform::data_dir()?;
            Ok(data_dir.join("logs"))
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }

    /// Check whether the backend address is configured.
    pub fn is_server_configured(&self) -> bool {
        !self.server.address.is_empty()
    }

    /// Sanitize and normalize a server address.
    ///
    /// Ensures the address has a scheme and strips trailing slashes.
    /// Real-time schemes are mapped back to their HTTP counterparts.
    pub fn sanitize_server_address(address: &str) -> String {
        let trimmed = address.trim().trim_matches('"').trim();
        if trimmed.is_empty() {
            return String::new();
        }

        let with_scheme = if let Some(rest) = trimmed.strip_prefix("wss://") {
            format!("https://{rest}")
        } else if let Some(rest) = trimmed.strip_prefix("ws://") {
            format!("http://{rest}")
        } else if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        with_scheme.trim_end_matches('/').to_string()
    }
}

/// Thread-safe configuration holder for shared access across services.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<AppConfig>>,
}

impl ConfigHandle {
    /// Create a new configuration handle.
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Read the configuration.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.read().await
    }

    /// Write/update the configuration.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, AppConfig> {
        self.inner.write().await
    }

    /// Save the current configuration to disk.
    pub async fn save(&self) -> RcResult<()> {
        let config = self.inner.read().await;
        config.save_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.api_timeout_ms, 30_000);
        assert_eq!(config.server.address, "http://localhost:8080");
        assert_eq!(config.chat.ws_path, "/ws/chat");
        assert_eq!(config.chat.history_path, "/api/chat/messages");
        assert_eq!(config.chat.max_reconnect_attempts, 5);
        assert_eq!(config.chat.reconnect_base_delay(), Duration::from_secs(1));
        assert_eq!(config.chat.reconnect_max_delay(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
        assert!(config.is_server_configured());
    }

    #[test]
    fn test_sanitize_server_address() {
        assert_eq!(
            AppConfig::sanitize_server_address("http://192.168.1.100:8080/"),
            "http://192.168.1.100:8080"
        );
        assert_eq!(
            AppConfig::sanitize_server_address("  \"https://example.com/\"  "),
            "https://example.com"
        );
        assert_eq!(
            AppConfig::sanitize_server_address("localhost:8080"),
            "http://localhost:8080"
        );
        assert_eq!(
            AppConfig::sanitize_server_address("wss://chat.example.com"),
            "https://chat.example.com"
        );
        assert_eq!(AppConfig::sanitize_server_address("   "), "");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [chat]
            max_reconnect_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.chat.max_reconnect_attempts, 3);
        assert_eq!(config.chat.reconnect_base_delay_ms, 1_000);
        assert_eq!(config.server.address, "http://localhost:8080");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.server.address = "https://recipes.example.com".into();
        config.chat.load_history = false;
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.server.address, "https://recipes.example.com");
        assert!(!loaded.chat.load_history);
    }

    #[test]
    fn test_load_sanitizes_address() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\naddress = \"example.com/\"\n").unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.server.address, "http://example.com");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[chat\nbroken").unwrap();

        let err = AppConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, RcError::Config(_)));
    }

    #[tokio::test]
    async fn test_config_handle_write_is_visible() {
        let handle = ConfigHandle::new(AppConfig::default());
        handle.write().await.chat.max_reconnect_attempts = 9;
        assert_eq!(handle.read().await.chat.max_reconnect_attempts, 9);
    }
}
