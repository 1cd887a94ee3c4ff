//! # Tessera - Device-Aware Parameter Replicas
//!
//! Tessera keeps the parameters of a model consistent across devices during
//! training. Layers ask a [`ParameterStore`](training::ParameterStore) for
//! the value of a parameter on the device their input lives on; the store
//! creates per-device replicas on first use and, in distributed mode, hands
//! gradients to a parameter server and pulls the updated values back.
//!
//! ## Crates
//!
//! - **core**: devices, element types, the error type
//! - **ndarray**: the `NdArray` abstraction, `ArrayManager` and the dense
//!   host `Tensor`
//! - **distributed**: the `ParameterServer` trait, reductions and an
//!   in-process server
//! - **training**: the parameter store and its configuration
//! - **nn**: parameters, blocks and the item `Embedding`
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tessera::prelude::*;
//!
//! let manager = Arc::new(ArrayManager::new(Device::Cpu));
//! let config = StoreConfig::from_toml_str(r#"
//!     [distributed]
//!     devices = ["gpu:0", "gpu:1"]
//!     learning_rate = 0.1
//! "#).unwrap();
//! let store = ParameterStore::from_config(Arc::clone(&manager), &config).unwrap();
//!
//! let embedding = Embedding::new(EmbeddingConfig::new(vec!["cat", "dog"], 4)).unwrap();
//! embedding.initialize(&[vec![1]]).unwrap();
//!
//! let indices = Tensor::from_vec_on(vec![1.0, 2.0], &[2], Device::Gpu(1)).unwrap();
//! let output = embedding.forward(&store, &[indices]).unwrap();
//! assert_eq!(output[0].shape(), &[2, 4]);
//! assert_eq!(store.len(), 1);
//! ```
//!
//! # Feature Flags
//!
//! - `full` (default): All features enabled
//! - `nn`: Parameters, blocks and layers
//!
//! @version 0.1.0
//! @author Tessera Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

// =============================================================================
// Crate Re-exports
// =============================================================================

pub use tessera_core as core;

pub use tessera_ndarray as ndarray;

pub use tessera_distributed as distributed;

pub use tessera_training as training;

#[cfg(feature = "nn")]
pub use tessera_nn as nn;

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for training code.
///
/// ```rust
/// use tessera::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use tessera_core::{DType, Device, Error, Result};

    // Arrays
    pub use tessera_ndarray::{ArrayManager, NdArray, Tensor};

    // Parameter servers
    pub use tessera_distributed::{LocalParameterServer, ParameterServer, ReduceOp};

    // Parameter store
    pub use tessera_training::{
        DistributedConfig, ParameterSource, ParameterStore, ReplicaStatus, StoreConfig,
    };

    // Blocks
    #[cfg(feature = "nn")]
    pub use tessera_nn::{Block, Embedding, EmbeddingConfig, Initializer, Parameter, ParameterType};
}
