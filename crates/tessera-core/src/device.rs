//! Device Abstraction - Compute Device Identifiers
//!
//! A `Device` names a compute unit that array data can live on. Devices are
//! cheap to copy and hash, so they double as keys of the parameter store's
//! slot map. They render as `cpu` / `gpu:<index>` and parse back from the
//! same strings, which is also their serialized form in configuration files.
//!
//! # Example
//! ```rust
//! use tessera_core::Device;
//!
//! let cpu = Device::Cpu;
//! assert!(cpu.is_cpu());
//! assert_eq!(Device::gpu(2).to_string(), "gpu:2");
//! assert_eq!("gpu:2".parse::<Device>().unwrap(), Device::Gpu(2));
//! ```
//!
//! @version 0.1.0
//! @author Tessera Development Team

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// =============================================================================
// Device Enum
// =============================================================================

/// Represents a compute device where arrays can be allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    /// Host CPU.
    Cpu,
    /// Accelerator with the given ordinal.
    Gpu(usize),
}

impl Device {
    /// Returns true if this is a CPU device.
    #[must_use]
    pub const fn is_cpu(self) -> bool {
        matches!(self, Self::Cpu)
    }

    /// Returns true if this is an accelerator.
    #[must_use]
    pub const fn is_gpu(self) -> bool {
        !self.is_cpu()
    }

    /// Returns the accelerator ordinal, or 0 for CPU.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Cpu => 0,
            Self::Gpu(idx) => idx,
        }
    }

    /// Returns the name of this device type.
    #[must_use]
    pub const fn device_type(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu(_) => "gpu",
        }
    }

    /// Returns the CPU device.
    #[must_use]
    pub const fn cpu() -> Self {
        Self::Cpu
    }

    /// Returns the accelerator with the given ordinal.
    #[must_use]
    pub const fn gpu(index: usize) -> Self {
        Self::Gpu(index)
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Gpu(idx) => write!(f, "gpu:{idx}"),
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        match trimmed.split_once(':') {
            None if trimmed == "cpu" => Ok(Self::Cpu),
            None if trimmed == "gpu" => Ok(Self::Gpu(0)),
            Some(("gpu", idx)) => idx
                .parse::<usize>()
                .map(Self::Gpu)
                .map_err(|_| Error::invalid_configuration(format!("invalid device index in '{s}'"))),
            _ => Err(Error::invalid_configuration(format!(
                "unrecognized device '{s}'"
            ))),
        }
    }
}

impl TryFrom<String> for Device {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
