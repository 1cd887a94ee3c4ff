//! tessera-nn - Neural Network Blocks
//!
//! Learnable parameters and the blocks that own them. Blocks read parameter
//! values through a [`ParameterStore`](tessera_training::ParameterStore), so
//! the same block serves single-device and multi-device training.
//!
//! # Key Components
//!
//! - **Parameter**: canonical array of one learnable tensor, with versioned
//!   persistence
//! - **Block trait**: forward pass, shape inference, parameter persistence
//! - **Embedding**: item-to-vector lookup table over any hashable item type
//! - **Initialization**: zeros, constant, normal, uniform, Xavier
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tessera_core::Device;
//! use tessera_ndarray::{ArrayManager, NdArray, Tensor};
//! use tessera_nn::prelude::*;
//! use tessera_training::ParameterStore;
//!
//! let items = vec!["cat", "dog"];
//! let embedding = Embedding::new(EmbeddingConfig::new(items, 4)).unwrap();
//! embedding.initialize(&[vec![1]]).unwrap();
//!
//! let manager = Arc::new(ArrayManager::new(Device::Cpu));
//! let store: ParameterStore<Tensor> = ParameterStore::new(Arc::clone(&manager), false);
//! let vector = embedding.forward_item(&store, &manager, &"dog").unwrap();
//! assert_eq!(vector.shape(), &[4]);
//! ```
//!
//! @version 0.1.0
//! @author Tessera Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// ML/tensor-specific allowances
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::neg_cmp_op_on_partial_ord)]
#![allow(clippy::items_after_statements)]

// =============================================================================
// Module Declarations
// =============================================================================

pub mod block;
pub mod init;
pub mod layers;
pub mod parameter;

// =============================================================================
// Re-exports
// =============================================================================

pub use block::Block;
pub use init::Initializer;
pub use layers::{Embedding, EmbeddingConfig};
pub use parameter::{Parameter, ParameterType, PARAMETER_VERSION};

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for building blocks.
pub mod prelude {
    pub use crate::{Block, Embedding, EmbeddingConfig, Initializer, Parameter, ParameterType};
    pub use tessera_training::ParameterSource;
}
