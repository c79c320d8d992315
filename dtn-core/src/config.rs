//! Core configuration, loadable from JSON5.
//!
//! ```
//! use dtn_core::CoreConfig;
//!
//! let config = CoreConfig::from_json5_str(
//!     r#"{
//!         // identifier the node answers to
//!         local_eid: "dtn://node-1",
//!         components: { link_local: false },
//!     }"#,
//! )
//! .unwrap();
//! assert!(config.components.registrar);
//! assert!(!config.components.link_local);
//! ```

use crate::eid::{Eid, EidFactory};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_LOCAL_EID: &str = "dtn://local-node";
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 256;
pub const DEFAULT_CHANNEL_EVENT_QUEUE_SIZE: usize = 64;
/// Upper bound for `event_bus_capacity` and `channel_event_queue_size`.
pub const MAX_QUEUE_CAPACITY: usize = 65_536;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse configuration: {0}")]
    Parse(#[from] json5::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Which components are enabled when the core starts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComponentsConfig {
    pub registrar: bool,
    pub link_local: bool,
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            registrar: true,
            link_local: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub local_eid: String,
    pub event_bus_capacity: usize,
    pub channel_event_queue_size: usize,
    pub components: ComponentsConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            local_eid: DEFAULT_LOCAL_EID.to_string(),
            event_bus_capacity: DEFAULT_EVENT_BUS_CAPACITY,
            channel_event_queue_size: DEFAULT_CHANNEL_EVENT_QUEUE_SIZE,
            components: ComponentsConfig::default(),
        }
    }
}

impl CoreConfig {
    pub fn from_json5_str(content: &str) -> Result<Self, ConfigError> {
        Ok(json5::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json5_str(&content)
    }

    /// Checks the values and returns the parsed local identifier.
    pub fn validate(&self, eid_factory: &dyn EidFactory) -> Result<Eid, ConfigError> {
        check_capacity("event_bus_capacity", self.event_bus_capacity)?;
        check_capacity("channel_event_queue_size", self.channel_event_queue_size)?;
        let local_eid = eid_factory
            .create(&self.local_eid)
            .map_err(|err| ConfigError::Invalid(format!("local_eid: {err}")))?;
        if local_eid.api_path().is_some() {
            return Err(ConfigError::Invalid(
                "local_eid cannot be the api:me pseudo-identifier".to_string(),
            ));
        }
        Ok(local_eid)
    }
}

fn check_capacity(name: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_QUEUE_CAPACITY {
        return Err(ConfigError::Invalid(format!(
            "{name} must be between 1 and {MAX_QUEUE_CAPACITY}, got {value}"
        )));
    }
    Ok(())
}
