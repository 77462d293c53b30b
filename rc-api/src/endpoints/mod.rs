//! API endpoint modules organized by category.
//!
//! Each module provides typed methods for a group of related backend endpoints.

pub mod auth;
pub mod chat;
