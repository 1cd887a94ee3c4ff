//! Tessera Core - Foundation Layer for the Tessera Framework
//!
//! This crate provides the abstractions every other Tessera crate builds on:
//! compute device identifiers, runtime data types and the unified error type.
//!
//! # Key Features
//! - Device identifiers (CPU and indexed accelerators) usable as map keys
//! - Runtime data type descriptors
//! - A single error enum shared by the array engine, the parameter store
//!   and the neural network layers
//!
//! # Example
//! ```rust
//! use tessera_core::{Device, DType};
//!
//! let device: Device = "gpu:1".parse().unwrap();
//! assert_eq!(device, Device::Gpu(1));
//! assert_eq!(DType::default(), DType::F32);
//! ```
//!
//! @version 0.1.0
//! @author Tessera Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::return_self_not_must_use)]

// =============================================================================
// Modules
// =============================================================================

pub mod device;
pub mod dtype;
pub mod error;

// =============================================================================
// Re-exports
// =============================================================================

pub use device::Device;
pub use dtype::DType;
pub use error::{Error, Result};

// =============================================================================
// Prelude
// =============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::device::Device;
    pub use crate::dtype::DType;
    pub use crate::error::{Error, Result};
}
