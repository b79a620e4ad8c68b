//! REST API client module for the snmpcollector service.
//!
//! This module provides the `ApiClient` for managing device configurations
//! and triggering configuration reloads on a remote snmpcollector agent.
//!
//! The API uses cookie-based sessions obtained from the `/login` endpoint.
//! Sessions are refreshed transparently before each request.

pub mod client;
pub mod error;

pub use client::{ApiClient, ClientOptions};
pub use error::{ApiError, Result};
