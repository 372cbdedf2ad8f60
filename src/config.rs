use serde::{Deserialize, Serialize};

use crate::registry::{Capacity, RegistryError};

/// Settings for building a registry, loadable from the host application's config
///
/// `max_listeners` accepts a non-negative integer or `"unbounded"` and
/// defaults to 10 when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub max_listeners: Capacity,
}

impl RegistryConfig {
    pub fn new(max_listeners: Capacity) -> Self {
        Self { max_listeners }
    }

    /// Parses a JSON document such as `{"max_listeners": 25}`
    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        serde_json::from_str(raw)
            .map_err(|e| RegistryError::invalid_argument(format!("registry config: {}", e)))
    }
}
