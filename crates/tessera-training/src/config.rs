//! Config - Parameter Store Configuration
//!
//! TOML description of a store: the local copy policy and, optionally, the
//! device list and update rule of a distributed session.
//!
//! ```toml
//! copy = false
//!
//! [distributed]
//! devices = ["gpu:0", "gpu:1"]
//! learning_rate = 0.05
//! reduce = "average"
//! ```
//!
//! @version 0.1.0
//! @author Tessera Development Team

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use tessera_core::{Device, Error, Result};
use tessera_distributed::{LocalParameterServer, ReduceOp};

// =============================================================================
// Store Configuration
// =============================================================================

/// Store configuration (store.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Always copy in local mode
    #[serde(default)]
    pub copy: bool,

    /// Distributed session, absent for local mode
    #[serde(default)]
    pub distributed: Option<DistributedConfig>,
}

/// Distributed session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributedConfig {
    /// Devices in slot order
    pub devices: Vec<Device>,

    /// SGD learning rate of the in-process server
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,

    /// Reduction across device slots
    #[serde(default)]
    pub reduce: ReduceOp,
}

fn default_learning_rate() -> f32 {
    0.01
}

impl DistributedConfig {
    /// Creates a configuration over `devices` with default update rule.
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices,
            learning_rate: default_learning_rate(),
            reduce: ReduceOp::default(),
        }
    }

    /// Builds the in-process server described by this section.
    pub fn build_server(&self) -> LocalParameterServer {
        LocalParameterServer::new(self.learning_rate, self.reduce)
    }

    /// Checks the device list and learning rate.
    pub fn validate(&self) -> Result<()> {
        if self.devices.is_empty() {
            return Err(Error::invalid_configuration(
                "distributed device list is empty",
            ));
        }
        let mut seen = HashSet::with_capacity(self.devices.len());
        for device in &self.devices {
            if !seen.insert(device) {
                return Err(Error::invalid_configuration(format!(
                    "device {device} listed more than once"
                )));
            }
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::invalid_configuration(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

impl StoreConfig {
    /// Local-mode configuration.
    pub fn local(copy: bool) -> Self {
        Self {
            copy,
            distributed: None,
        }
    }

    /// Distributed configuration over `devices`.
    pub fn distributed(devices: Vec<Device>) -> Self {
        Self {
            copy: false,
            distributed: Some(DistributedConfig::new(devices)),
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: StoreConfig =
            toml::from_str(content).map_err(|e| Error::serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Renders configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::serialization(e.to_string()))
    }

    /// Saves configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the distributed section, if any.
    pub fn validate(&self) -> Result<()> {
        match &self.distributed {
            Some(distributed) => distributed.validate(),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tessera_ndarray::ArrayManager;

    use crate::ParameterStore;

    #[test]
    fn test_default_is_local() {
        let config = StoreConfig::default();
        assert!(!config.copy);
        assert!(config.distributed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_distributed_section() {
        let config = StoreConfig::from_toml_str(
            r#"
            copy = true

            [distributed]
            devices = ["gpu:0", "GPU:1", "cpu"]
            reduce = "average"
            "#,
        )
        .unwrap();

        assert!(config.copy);
        let distributed = config.distributed.unwrap();
        assert_eq!(
            distributed.devices,
            vec![Device::Gpu(0), Device::Gpu(1), Device::Cpu]
        );
        assert_eq!(distributed.learning_rate, 0.01);
        assert_eq!(distributed.reduce, ReduceOp::Average);
    }

    #[test]
    fn test_rejects_duplicate_and_empty_devices() {
        let duplicate = StoreConfig::from_toml_str(
            r#"
            [distributed]
            devices = ["gpu:0", "gpu:0"]
            "#,
        );
        assert!(matches!(
            duplicate,
            Err(Error::InvalidConfiguration { .. })
        ));

        let empty = StoreConfig::distributed(Vec::new());
        assert!(empty.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_rejects_bad_learning_rate() {
        let mut config = DistributedConfig::new(vec![Device::Cpu]);
        config.learning_rate = 0.0;
        assert!(config.validate().is_err());
        config.learning_rate = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(
            StoreConfig::from_toml_str("[distributed]\ndevices = [\"tpu:0\"]"),
            Err(Error::SerializationError { .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.toml");

        let mut config = StoreConfig::distributed(vec![Device::Gpu(0), Device::Gpu(1)]);
        if let Some(distributed) = config.distributed.as_mut() {
            distributed.learning_rate = 0.5;
            distributed.reduce = ReduceOp::Max;
        }
        config.save(&path).unwrap();

        let loaded = StoreConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            StoreConfig::load(dir.path().join("absent.toml")),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_store_from_config() {
        let manager = Arc::new(ArrayManager::new(Device::Cpu));

        let local = ParameterStore::from_config(Arc::clone(&manager), &StoreConfig::local(true))
            .unwrap();
        assert!(local.is_copy());
        assert!(!local.is_distributed());
        assert_eq!(local.devices(), vec![Device::Cpu]);

        let config = StoreConfig::distributed(vec![Device::Gpu(0), Device::Gpu(1)]);
        let distributed = ParameterStore::from_config(manager, &config).unwrap();
        assert!(distributed.is_distributed());
        assert_eq!(distributed.device_count(), 2);
        assert_eq!(
            distributed.parameter_server().map(|s| s.name().to_string()),
            Some("local".to_string())
        );
    }
}
