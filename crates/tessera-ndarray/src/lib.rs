//! Tessera NdArray - Array Abstraction Layer
//!
//! The parameter store and the layers never depend on a concrete array type.
//! They program against the [`NdArray`] trait, which captures the handful of
//! capabilities they need: device placement, copying to another device with
//! gradient tracking, gradient access, binding to an allocation context and
//! reshaping.
//!
//! This crate also ships [`Tensor`], a dense `f32` array resident in host
//! memory that implements the trait. Devices other than the CPU are placement
//! tags for it; data always lives on the host. It is the reference engine
//! used by the embedding layer, the in-process parameter server and the
//! tests.
//!
//! # Example
//! ```rust
//! use tessera_core::Device;
//! use tessera_ndarray::{ArrayManager, NdArray, Tensor};
//!
//! let manager = ArrayManager::new(Device::Cpu);
//! let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
//! let copy = t.to_device(Device::Gpu(1), true).unwrap();
//! copy.attach(&manager);
//!
//! assert_eq!(copy.device(), Device::Gpu(1));
//! assert!(!copy.same_array(&t));
//! assert_eq!(manager.attached_count(), 1);
//! ```
//!
//! @version 0.1.0
//! @author Tessera Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::float_cmp)]

// =============================================================================
// Modules
// =============================================================================

pub mod array;
pub mod manager;
pub mod tensor;

// =============================================================================
// Re-exports
// =============================================================================

pub use array::NdArray;
pub use manager::ArrayManager;
pub use tensor::{Tensor, TensorData};

// =============================================================================
// Prelude
// =============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::array::NdArray;
    pub use crate::manager::ArrayManager;
    pub use crate::tensor::Tensor;
    pub use tessera_core::prelude::*;
}
