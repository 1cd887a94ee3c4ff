//! Parameter - Learnable Parameter Wrapper
//!
//! A parameter owns the canonical array of one learnable tensor of a block.
//! Its id is unique per instance and is the key under which the
//! [`ParameterStore`](tessera_training::ParameterStore) keeps its replicas.
//!
//! # Persisted Format
//! One version byte followed by a bincode-encoded [`TensorData`].
//!
//! @version 0.1.0
//! @author Tessera Development Team

use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tessera_core::{Error, Result};
use tessera_ndarray::{ArrayManager, NdArray, Tensor, TensorData};
use tessera_training::ParameterSource;

use crate::init::Initializer;

/// Encoding version written before every parameter payload.
pub const PARAMETER_VERSION: u8 = 1;

static NEXT_PARAMETER: AtomicU64 = AtomicU64::new(0);

// =============================================================================
// ParameterType
// =============================================================================

/// Role of a parameter within its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    /// Weight matrix or lookup table.
    Weight,
    /// Additive bias.
    Bias,
    /// Normalization scale.
    Gamma,
    /// Normalization shift.
    Beta,
    /// Running mean statistic.
    RunningMean,
    /// Running variance statistic.
    RunningVar,
    /// Anything else.
    Other,
}

impl ParameterType {
    /// Initializer used unless the block overrides it.
    pub const fn default_initializer(self) -> Initializer {
        match self {
            ParameterType::Weight => Initializer::XavierUniform,
            ParameterType::Gamma | ParameterType::RunningVar => Initializer::Ones,
            ParameterType::Bias
            | ParameterType::Beta
            | ParameterType::RunningMean
            | ParameterType::Other => Initializer::Zeros,
        }
    }

    /// Returns true for running statistics, which never take gradients.
    pub const fn is_statistic(self) -> bool {
        matches!(self, ParameterType::RunningMean | ParameterType::RunningVar)
    }
}

// =============================================================================
// Parameter
// =============================================================================

/// A learnable parameter of a block.
///
/// Clones share the array cell, so a block and a caller holding a clone see
/// the same array.
#[derive(Clone)]
pub struct Parameter {
    id: String,
    name: String,
    kind: ParameterType,
    requires_grad: bool,
    initializer: Initializer,
    array: Arc<RwLock<Option<Tensor>>>,
}

impl Parameter {
    /// Creates an uninitialized parameter.
    pub fn new(name: impl Into<String>, kind: ParameterType) -> Self {
        let name = name.into();
        let serial = NEXT_PARAMETER.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("{name}-{serial}"),
            name,
            kind,
            requires_grad: !kind.is_statistic(),
            initializer: kind.default_initializer(),
            array: Arc::new(RwLock::new(None)),
        }
    }

    /// Replaces the initializer.
    #[must_use]
    pub fn with_initializer(mut self, initializer: Initializer) -> Self {
        self.initializer = initializer;
        self
    }

    /// Sets whether replicas of this parameter take gradients.
    #[must_use]
    pub fn with_requires_grad(mut self, requires_grad: bool) -> Self {
        self.requires_grad = requires_grad;
        self
    }

    /// Returns the unique id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the name within the block.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameter role.
    pub fn kind(&self) -> ParameterType {
        self.kind
    }

    /// Returns the initializer.
    pub fn initializer(&self) -> Initializer {
        self.initializer
    }

    /// Returns whether the array has been created.
    pub fn is_initialized(&self) -> bool {
        self.array.read().is_some()
    }

    /// Returns the shape, if initialized.
    pub fn shape(&self) -> Option<Vec<usize>> {
        self.array.read().as_ref().map(|a| a.shape().to_vec())
    }

    /// Returns the number of elements, or 0 if uninitialized.
    pub fn numel(&self) -> usize {
        self.array.read().as_ref().map_or(0, Tensor::numel)
    }

    /// Creates the array with the configured initializer.
    ///
    /// Does nothing if the parameter is already initialized.
    pub fn initialize(&self, shape: &[usize]) -> Result<()> {
        let mut array = self.array.write();
        if array.is_some() {
            return Ok(());
        }
        let tensor = self
            .initializer
            .init(shape)?
            .with_requires_grad(self.requires_grad);
        debug!(parameter_id = %self.id, ?shape, "initialized parameter");
        *array = Some(tensor);
        Ok(())
    }

    /// Replaces the canonical array.
    pub fn set_array(&self, array: Tensor) {
        *self.array.write() = Some(array.with_requires_grad(self.requires_grad));
    }

    /// Returns the canonical array, if initialized.
    pub fn try_array(&self) -> Option<Tensor> {
        self.array.read().clone()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Writes the version byte and the array.
    pub fn save<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let array = ParameterSource::array(self)?;
        writer.write_all(&[PARAMETER_VERSION])?;
        bincode::serialize_into(&mut *writer, &TensorData::from_tensor(&array))
            .map_err(|e| Error::serialization(e.to_string()))
    }

    /// Reads an array written by [`save`](Self::save).
    ///
    /// When the current array has the loaded shape its values are
    /// overwritten in place, so replicas sharing it see the new values;
    /// otherwise it is replaced by an array created on `manager`.
    pub fn load<R: Read + ?Sized>(&self, manager: &ArrayManager, reader: &mut R) -> Result<()> {
        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != PARAMETER_VERSION {
            return Err(Error::UnsupportedVersion {
                found: version[0],
                expected: PARAMETER_VERSION,
            });
        }
        let data: TensorData = bincode::deserialize_from(&mut *reader)
            .map_err(|e| Error::serialization(e.to_string()))?;
        if data.numel() != data.shape.iter().product::<usize>() {
            return Err(Error::shape_mismatch(&data.shape, &[data.numel()]));
        }

        let mut array = self.array.write();
        match array.as_ref() {
            Some(current) if current.shape() == data.shape.as_slice() => {
                current.assign(&data.values)?;
            }
            _ => {
                let loaded = manager
                    .create(data.values, &data.shape)?
                    .with_requires_grad(self.requires_grad);
                *array = Some(loaded);
            }
        }
        debug!(parameter_id = %self.id, shape = ?data.shape, "loaded parameter");
        Ok(())
    }

    /// Human-readable dump of the parameter and its values.
    pub fn to_json(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Dump<'a> {
            id: &'a str,
            name: &'a str,
            kind: ParameterType,
            requires_grad: bool,
            data: Option<TensorData>,
        }

        let dump = Dump {
            id: &self.id,
            name: &self.name,
            kind: self.kind,
            requires_grad: self.requires_grad,
            data: self.array.read().as_ref().map(TensorData::from_tensor),
        };
        serde_json::to_string_pretty(&dump).map_err(|e| Error::serialization(e.to_string()))
    }
}

impl ParameterSource for Parameter {
    type Array = Tensor;

    fn id(&self) -> &str {
        &self.id
    }

    fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    fn array(&self) -> Result<Tensor> {
        self.try_array().ok_or_else(|| Error::Uninitialized {
            name: self.id.clone(),
        })
    }
}

impl std::fmt::Debug for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parameter")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("shape", &self.shape())
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
