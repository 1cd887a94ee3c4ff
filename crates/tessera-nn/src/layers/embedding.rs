//! Embedding Layer - Lookup Table for Arbitrary Items
//!
//! Maps items of any hashable type to dense vectors. Items are numbered in
//! the order they were configured; with a default embedding, row 0 is
//! reserved for items that were never configured.
//!
//! # Shape
//! - Input: index array of rank 0, 1 or 2
//! - Output: input shape followed by `embedding_size`
//!
//! @version 0.1.0
//! @author Tessera Development Team

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::io::{Read, Write};

use tracing::trace;

use tessera_core::{DType, Error, Result};
use tessera_ndarray::{ArrayManager, NdArray, Tensor};
use tessera_training::ParameterStore;

use crate::block::Block;
use crate::init::Initializer;
use crate::parameter::{Parameter, ParameterType};

/// Encoding version written by [`Embedding::save_parameters`].
pub const EMBEDDING_VERSION: u8 = 1;

/// Largest table the layer accepts. Row indices travel as `f32` values,
/// which represent every integer up to this bound exactly.
pub const MAX_ITEMS: usize = 1 << 24;

const EMBEDDING: &str = "embedding";

fn check_row_count(num_items: usize) -> Result<()> {
    if num_items > MAX_ITEMS {
        return Err(Error::invalid_configuration(format!(
            "embedding table of {num_items} rows exceeds the limit of {MAX_ITEMS}"
        )));
    }
    Ok(())
}

// =============================================================================
// EmbeddingConfig
// =============================================================================

/// Settings for an [`Embedding`].
#[derive(Debug, Clone)]
pub struct EmbeddingConfig<T> {
    /// Items that get their own row, in row order. Required.
    pub items: Option<Vec<T>>,
    /// Length of each embedding vector. Must be positive.
    pub embedding_size: usize,
    /// Reserve row 0 for unknown items instead of failing on them.
    pub use_default: bool,
    /// Element type of the table.
    pub dtype: DType,
}

impl<T> Default for EmbeddingConfig<T> {
    fn default() -> Self {
        Self {
            items: None,
            embedding_size: 0,
            use_default: true,
            dtype: DType::F32,
        }
    }
}

impl<T> EmbeddingConfig<T> {
    /// Creates a configuration for `items` with default embedding enabled.
    pub fn new(items: Vec<T>, embedding_size: usize) -> Self {
        Self {
            items: Some(items),
            embedding_size,
            ..Self::default()
        }
    }

    /// Sets whether unknown items map to the default row.
    #[must_use]
    pub fn use_default(mut self, use_default: bool) -> Self {
        self.use_default = use_default;
        self
    }

    /// Sets the element type.
    #[must_use]
    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }
}

// =============================================================================
// Embedding
// =============================================================================

/// A lookup table of embeddings for a fixed set of items.
pub struct Embedding<T> {
    embedding: Parameter,
    embedder: HashMap<T, usize>,
    num_items: usize,
    embedding_size: usize,
    use_default: bool,
    dtype: DType,
}

impl<T> Embedding<T>
where
    T: Hash + Eq + fmt::Debug + Send + Sync,
{
    /// Builds the layer from `config`.
    ///
    /// If an item is listed twice it keeps the row of its last occurrence;
    /// the table still has one row per listed entry.
    pub fn new(config: EmbeddingConfig<T>) -> Result<Self> {
        let items = config.items.ok_or_else(|| {
            Error::invalid_configuration("the items to embed must be specified")
        })?;
        if config.embedding_size == 0 {
            return Err(Error::invalid_configuration(
                "the embedding size must be specified",
            ));
        }
        if config.dtype != DType::F32 {
            return Err(Error::DTypeMismatch {
                expected: DType::F32,
                actual: config.dtype,
            });
        }

        let offset = usize::from(config.use_default);
        let num_items = items.len() + offset;
        check_row_count(num_items)?;
        let mut embedder = HashMap::with_capacity(items.len());
        for (row, item) in items.into_iter().enumerate() {
            embedder.insert(item, row + offset);
        }

        Ok(Self {
            embedding: Parameter::new(EMBEDDING, ParameterType::Weight)
                .with_initializer(Initializer::Normal(0.0, 1.0)),
            embedder,
            num_items,
            embedding_size: config.embedding_size,
            use_default: config.use_default,
            dtype: config.dtype,
        })
    }

    /// Returns the number of table rows, including the default row.
    pub fn num_items(&self) -> usize {
        self.num_items
    }

    /// Returns the length of each embedding vector.
    pub fn embedding_size(&self) -> usize {
        self.embedding_size
    }

    /// Returns whether unknown items map to row 0.
    pub fn uses_default(&self) -> bool {
        self.use_default
    }

    /// Returns the element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Returns the lookup table parameter.
    pub fn weight(&self) -> &Parameter {
        &self.embedding
    }

    /// Shape of the lookup table.
    pub fn table_shape(&self) -> Vec<usize> {
        vec![self.num_items, self.embedding_size]
    }

    // =========================================================================
    // Item Mapping
    // =========================================================================

    /// Row of `item`.
    pub fn embed(&self, item: &T) -> Result<usize> {
        match self.embedder.get(item) {
            Some(&row) => Ok(row),
            None if self.use_default => Ok(0),
            None => Err(Error::ItemNotFound {
                item: format!("{item:?}"),
            }),
        }
    }

    /// Rows of `items`.
    pub fn embed_slice(&self, items: &[T]) -> Result<Vec<usize>> {
        items.iter().map(|item| self.embed(item)).collect()
    }

    /// Rows of a rectangular batch of items.
    pub fn embed_batch(&self, items: &[Vec<T>]) -> Result<Vec<Vec<usize>>> {
        let width = items.first().map_or(0, Vec::len);
        items
            .iter()
            .map(|row| {
                if row.len() != width {
                    return Err(Error::shape_mismatch(&[width], &[row.len()]));
                }
                self.embed_slice(row)
            })
            .collect()
    }

    // =========================================================================
    // Forward Conveniences
    // =========================================================================

    /// Embedding of one item, shape `[embedding_size]`.
    pub fn forward_item(
        &self,
        store: &ParameterStore<Tensor>,
        manager: &ArrayManager,
        item: &T,
    ) -> Result<Tensor> {
        let row = self.embed(item)?;
        let indices = manager.create(vec![row as f32], &[])?;
        self.forward_single(store, indices)
    }

    /// Embeddings of `items`, shape `[items.len(), embedding_size]`.
    pub fn forward_items(
        &self,
        store: &ParameterStore<Tensor>,
        manager: &ArrayManager,
        items: &[T],
    ) -> Result<Tensor> {
        let rows = self.embed_slice(items)?;
        let indices = manager.create(to_values(&rows), &[rows.len()])?;
        self.forward_single(store, indices)
    }

    /// Embeddings of a batch, shape `[rows, columns, embedding_size]`.
    pub fn forward_batch(
        &self,
        store: &ParameterStore<Tensor>,
        manager: &ArrayManager,
        items: &[Vec<T>],
    ) -> Result<Tensor> {
        let rows = self.embed_batch(items)?;
        let width = rows.first().map_or(0, Vec::len);
        let flat: Vec<usize> = rows.into_iter().flatten().collect();
        let indices = manager.create(to_values(&flat), &[items.len(), width])?;
        self.forward_single(store, indices)
    }

    fn forward_single(&self, store: &ParameterStore<Tensor>, indices: Tensor) -> Result<Tensor> {
        self.forward(store, &[indices])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::invalid_operation("embedding produced no output"))
    }
}

fn to_values(rows: &[usize]) -> Vec<f32> {
    rows.iter().map(|&row| row as f32).collect()
}

impl<T> Block for Embedding<T>
where
    T: Hash + Eq + fmt::Debug + Send + Sync,
{
    fn forward(&self, store: &ParameterStore<Tensor>, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
        let items = inputs
            .first()
            .ok_or_else(|| Error::invalid_operation("embedding expects one input"))?;
        if items.ndim() > 2 {
            return Err(Error::invalid_operation(format!(
                "embedding input must have rank 0, 1 or 2, got shape {:?}",
                items.shape()
            )));
        }

        let device = items.device();
        let table = store.get_value(&self.embedding, device)?;
        trace!(parameter_id = %self.embedding.id(), %device, shape = ?items.shape(), "embedding lookup");

        let output = if items.ndim() == 0 {
            table
                .gather_rows(&items.reshape(&[1])?)?
                .reshape(&[self.embedding_size])?
        } else {
            table.gather_rows(items)?
        };
        Ok(vec![output])
    }

    fn output_shapes(&self, input_shapes: &[Vec<usize>]) -> Result<Vec<Vec<usize>>> {
        let input = input_shapes
            .first()
            .ok_or_else(|| Error::invalid_operation("embedding expects one input shape"))?;
        let mut output = input.clone();
        output.push(self.embedding_size);
        Ok(vec![output])
    }

    fn direct_parameters(&self) -> Vec<&Parameter> {
        vec![&self.embedding]
    }

    fn parameter_shape(&self, name: &str, _input_shapes: &[Vec<usize>]) -> Result<Vec<usize>> {
        if name == EMBEDDING {
            Ok(self.table_shape())
        } else {
            Err(Error::invalid_operation(format!(
                "invalid parameter name '{name}'"
            )))
        }
    }

    fn save_parameters(&self, writer: &mut dyn Write) -> Result<()> {
        writer.write_all(&[EMBEDDING_VERSION])?;
        self.embedding.save(writer)
    }

    fn load_parameters(&self, manager: &ArrayManager, reader: &mut dyn Read) -> Result<()> {
        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != EMBEDDING_VERSION {
            return Err(Error::UnsupportedVersion {
                found: version[0],
                expected: EMBEDDING_VERSION,
            });
        }
        self.embedding.load(manager, reader)
    }

    fn name(&self) -> &'static str {
        "Embedding"
    }
}

impl<T> fmt::Debug for Embedding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embedding")
            .field("num_items", &self.num_items)
            .field("embedding_size", &self.embedding_size)
            .field("use_default", &self.use_default)
            .field("dtype", &self.dtype)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
