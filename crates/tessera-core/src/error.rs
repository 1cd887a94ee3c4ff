//! Error Types - Tessera Error Handling
//!
//! One error enum covers the array engine, the parameter store, the
//! parameter server adapters and the layers. Variants fall into four groups:
//! configuration errors, lookup misses, distributed backend failures and
//! array engine failures.
//!
//! @version 0.1.0
//! @author Tessera Development Team

use thiserror::Error;

use crate::device::Device;
use crate::dtype::DType;

// =============================================================================
// Error Types
// =============================================================================

/// The main error type for Tessera operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A device was requested that is not registered with the store.
    #[error("Unknown device: {device} is not registered with the parameter store")]
    UnknownDevice {
        /// The unregistered device.
        device: Device,
    },

    /// A configuration value is missing or invalid.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the problem.
        message: String,
    },

    /// A persisted stream carries a version this build cannot read.
    #[error("Unsupported encoding version: {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version byte read from the stream.
        found: u8,
        /// Version byte this build writes.
        expected: u8,
    },

    /// An operation requires a parameter server but none is configured.
    #[error("No parameter server configured")]
    NoParameterServer,

    /// A parameter was used before being initialized.
    #[error("Parameter '{name}' has not been initialized")]
    Uninitialized {
        /// Name of the parameter.
        name: String,
    },

    /// An item was not present in an embedding's vocabulary.
    #[error("The provided item was not found: {item}")]
    ItemNotFound {
        /// Debug rendering of the missing item.
        item: String,
    },

    /// The parameter server reported a failure.
    #[error("Parameter server error: {message}")]
    ParameterServer {
        /// Description of the failure.
        message: String,
    },

    /// A trainable replica carries no gradient at synchronization time.
    #[error("Parameter '{parameter_id}' has no gradient on slot {slot}")]
    MissingGradient {
        /// Parameter id.
        parameter_id: String,
        /// Device slot of the replica.
        slot: usize,
    },

    /// A replica entry was left unusable by a failed first touch.
    #[error("Replica entry for '{parameter_id}' is poisoned: {reason}")]
    PoisonedEntry {
        /// Parameter id.
        parameter_id: String,
        /// Error that poisoned the entry.
        reason: String,
    },

    /// Shape mismatch between arrays.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape.
        actual: Vec<usize>,
    },

    /// Data type not supported by the operation.
    #[error("DType mismatch: expected {expected:?}, got {actual:?}")]
    DTypeMismatch {
        /// The expected data type.
        expected: DType,
        /// The actual data type.
        actual: DType,
    },

    /// Index out of bounds.
    #[error("Index out of bounds: index {index} for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index.
        index: usize,
        /// The size of the dimension.
        size: usize,
    },

    /// Invalid operation for the given array.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// I/O failure while reading or writing a stream.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error.
        message: String,
    },
}

// =============================================================================
// Result Type
// =============================================================================

/// A specialized Result type for Tessera operations.
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// Helper Functions
// =============================================================================

impl Error {
    /// Creates a new shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Creates a new invalid operation error.
    #[must_use]
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a new invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Creates a new parameter server error.
    #[must_use]
    pub fn parameter_server(message: impl Into<String>) -> Self {
        Self::ParameterServer {
            message: message.into(),
        }
    }

    /// Creates a new serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by configuration rather than data.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownDevice { .. }
                | Self::InvalidConfiguration { .. }
                | Self::UnsupportedVersion { .. }
                | Self::NoParameterServer
                | Self::Uninitialized { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
