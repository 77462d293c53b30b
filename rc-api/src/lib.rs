//! RecipeChat API - HTTP client for the recipechat backend REST API.
//!
//! This crate provides a typed HTTP client for the account endpoints
//! (login, registration, profile) and the chat history endpoint. It handles
//! bearer authentication, SSL certificate handling, and automatic retry with
//! exponential backoff.

pub mod client;
pub mod endpoints;
pub mod response;

// Re-export key types
pub use client::{ApiClient, RetryConfig};
pub use response::{AuthResponse, UserProfile};
