//! recipechat Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by all other recipechat crates:
//! - Application configuration (server URL, chat endpoint, reconnect policy)
//! - Global error types covering all error categories
//! - Structured logging with tracing
//! - Platform directory resolution
//! - Access token persistence
//! - Common constants

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;
pub mod token_store;

// Re-export commonly used items at the crate root
pub use config::AppConfig;
pub use error::{RcError, RcResult};
pub use logging::init_logging;
pub use platform::Platform;
pub use token_store::TokenStore;
