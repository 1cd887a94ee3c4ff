//! Tessera Training - Parameter Replicas and Gradient Synchronization
//!
//! The [`ParameterStore`] answers one question for layers: "what is the
//! value of parameter P on device D?". It materializes per-device replicas
//! lazily on first touch, keeps them for the lifetime of the training
//! session and, in distributed mode, drives a [`ParameterServer`] to push
//! gradients and pull updated values for every trainable parameter.
//!
//! # Modes
//! - **Local**: one registered device, no server. Replicas are the canonical
//!   array itself or a copy when the store is configured to copy or the
//!   canonical array lives elsewhere.
//! - **Distributed**: an ordered device list plus a server. First touch
//!   builds one replica per device slot and registers them with the server.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tessera_core::Device;
//! use tessera_distributed::{LocalParameterServer, ReduceOp};
//! use tessera_ndarray::{ArrayManager, Tensor};
//! use tessera_training::{ParameterSource, ParameterStore};
//!
//! struct Weight(Tensor);
//!
//! impl ParameterSource for Weight {
//!     type Array = Tensor;
//!     fn id(&self) -> &str { "weight" }
//!     fn requires_grad(&self) -> bool { true }
//!     fn array(&self) -> tessera_core::Result<Tensor> { Ok(self.0.clone()) }
//! }
//!
//! let store: ParameterStore<Tensor> =
//!     ParameterStore::new(Arc::new(ArrayManager::new(Device::Cpu)), false);
//! let server = Arc::new(LocalParameterServer::new(0.1, ReduceOp::Sum));
//! store.configure_distributed(server, &[Device::Gpu(0), Device::Gpu(1)]).unwrap();
//!
//! let weight = Weight(Tensor::zeros(&[4]));
//! let on_gpu1 = store.get_value(&weight, Device::Gpu(1)).unwrap();
//! assert_eq!(store.device_count(), 2);
//! # let _ = on_gpu1;
//! ```
//!
//! @version 0.1.0
//! @author Tessera Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::float_cmp)]

// =============================================================================
// Modules
// =============================================================================

pub mod config;
pub mod registry;
pub mod replica;
pub mod source;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DistributedConfig, StoreConfig};
pub use registry::DeviceRegistry;
pub use replica::ReplicaStatus;
pub use source::ParameterSource;
pub use store::ParameterStore;
pub use tessera_distributed::ParameterServer;

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for training code.
pub mod prelude {
    pub use crate::{
        DeviceRegistry, DistributedConfig, ParameterServer, ParameterSource, ParameterStore,
        ReplicaStatus, StoreConfig,
    };
}
