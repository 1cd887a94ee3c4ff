//! Neural Network Layers
//!
//! @version 0.1.0
//! @author Tessera Development Team

pub mod embedding;

// Re-exports
pub use embedding::{Embedding, EmbeddingConfig, EMBEDDING_VERSION, MAX_ITEMS};
