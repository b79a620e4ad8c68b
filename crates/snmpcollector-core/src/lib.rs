//! Client library for the snmpcollector REST API.
//!
//! Logs in with a session cookie, keeps that session fresh, and exposes the
//! device configuration resources and the agent reload endpoint.
//!
//! ```no_run
//! # async fn run() -> snmpcollector_core::api::Result<()> {
//! use snmpcollector_core::ApiClient;
//!
//! let client = ApiClient::new("http://localhost:8090", "admin", "admin")?;
//! let devices = client.get_devices_config().await?;
//! println!("{}", devices);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError, ClientOptions};
pub use auth::{CredentialStore, Credentials, Session};
pub use config::Config;
pub use models::{device_config_path, ApiResponse, DeviceConfig, ResourcePath};
