//! Tessera Distributed - Parameter Server Adapters
//!
//! The parameter store hands gradient aggregation and value broadcast to a
//! [`ParameterServer`]. This crate defines that seam and provides an
//! in-process implementation for single-host multi-device training and for
//! tests.
//!
//! # Features
//! - [`ParameterServer`] trait: `init` / `push` / `pull` with priorities
//! - [`ReduceOp`] reductions used to combine per-device gradients
//! - [`LocalParameterServer`]: keeps a master copy per parameter, reduces
//!   pushed gradients and applies an SGD step on pull
//!
//! # Example
//!
//! ```rust
//! use tessera_distributed::{LocalParameterServer, ParameterServer, ReduceOp};
//! use tessera_ndarray::Tensor;
//!
//! let server = LocalParameterServer::new(0.5, ReduceOp::Sum);
//! let replica = Tensor::from_vec(vec![1.0, 1.0], &[2]).unwrap();
//! server.init("w", &[replica.clone()]).unwrap();
//!
//! let grad = Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap();
//! server.push("w", &[grad], 0).unwrap();
//! server.pull("w", &[replica.clone()], 0).unwrap();
//! assert_eq!(replica.to_vec(), vec![0.5, 0.0]);
//! ```
//!
//! @version 0.1.0
//! @author Tessera Development Team

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
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

pub mod local;
pub mod reduce;
pub mod server;

// =============================================================================
// Re-exports
// =============================================================================

pub use local::{LocalParameterServer, ServerStats};
pub use reduce::ReduceOp;
pub use server::ParameterServer;

// =============================================================================
// Prelude
// =============================================================================

/// Common imports for distributed training.
pub mod prelude {
    pub use crate::{LocalParameterServer, ParameterServer, ReduceOp, ServerStats};
}
