//! Data models for snmpcollector resources.
//!
//! Device configurations are opaque JSON objects: this crate never imposes
//! a schema on them, it only routes them to the right resource path.
//!
//! - `DeviceConfig`: a device configuration body
//! - `ResourcePath`: device config collection or single device, persisted or runtime
//! - `ApiResponse`: structured JSON or raw text, chosen by content type

pub mod device;
pub mod response;

pub use device::{device_config_path, DeviceConfig, ResourcePath, DEVICE_CONFIG_BASE};
pub use response::ApiResponse;
