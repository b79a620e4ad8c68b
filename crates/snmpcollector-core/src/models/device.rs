use std::fmt;

use serde_json::{Map, Value};

/// Base path of the device configuration resources
pub const DEVICE_CONFIG_BASE: &str = "/api/cfg/snmpdevice";

/// Suffix selecting the in-memory (active) copy instead of the database copy
const RUNTIME_SUFFIX: &str = "/runtime";

/// A device configuration body, passed through to the service unchanged.
pub type DeviceConfig = Map<String, Value>;

/// Identifies a device configuration resource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourcePath {
    pub id: Option<String>,
    pub runtime: bool,
}

impl ResourcePath {
    /// The collection of all device configs
    pub fn collection(runtime: bool) -> Self {
        Self { id: None, runtime }
    }

    /// A single device config
    pub fn device(id: impl Into<String>, runtime: bool) -> Self {
        Self {
            id: Some(id.into()),
            runtime,
        }
    }

    pub fn to_path(&self) -> String {
        device_config_path(self.id.as_deref(), self.runtime)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_path())
    }
}

/// Build the path of a device config resource.
///
/// An empty id is treated the same as no id.
pub fn device_config_path(id: Option<&str>, runtime: bool) -> String {
    let mut path = String::from(DEVICE_CONFIG_BASE);
    if let Some(id) = id.filter(|id| !id.is_empty()) {
        path.push('/');
        path.push_str(id);
    }
    if runtime {
        path.push_str(RUNTIME_SUFFIX);
    }
    path
}
