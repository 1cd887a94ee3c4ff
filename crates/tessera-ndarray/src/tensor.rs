//! Tensor - Dense Host Array
//!
//! `Tensor` is a dense, row-major `f32` array whose data always lives in host
//! memory. Its device is a placement tag, which is all the parameter store
//! needs to exercise its placement policy. Cloning a `Tensor` produces
//! another handle to the same data and gradient cell; use
//! [`NdArray::to_device`] for an independent copy.
//!
//! # Key Features
//! - Shared, lock-protected storage so parameter servers can write in place
//! - Per-array gradient cell
//! - Row gathering for embedding lookups
//!
//! @version 0.1.0
//! @author Tessera Development Team

use core::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use tessera_core::{Device, Error, Result};

use crate::array::NdArray;
use crate::manager::{next_id, ArrayManager};

// =============================================================================
// Tensor Struct
// =============================================================================

/// A dense `f32` array with a device tag and an optional gradient.
#[derive(Clone)]
pub struct Tensor {
    /// Identity of this array instance (shared by clones).
    id: u64,
    /// Row-major element storage.
    data: Arc<RwLock<Vec<f32>>>,
    /// Dimensions.
    shape: Vec<usize>,
    /// Device the array is placed on.
    device: Device,
    /// Whether gradients are tracked for this array.
    requires_grad: bool,
    /// Accumulated gradient.
    grad: Arc<RwLock<Option<Tensor>>>,
    /// Id of the manager this array is attached to.
    manager: Arc<RwLock<Option<u64>>>,
}

fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

impl Tensor {
    // =========================================================================
    // Constructors
    // =========================================================================

    fn from_parts(data: Vec<f32>, shape: Vec<usize>, device: Device, requires_grad: bool) -> Self {
        Self {
            id: next_id(),
            data: Arc::new(RwLock::new(data)),
            shape,
            device,
            requires_grad,
            grad: Arc::new(RwLock::new(None)),
            manager: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a CPU tensor from a vector with the given shape.
    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self> {
        Self::from_vec_on(data, shape, Device::Cpu)
    }

    /// Creates a tensor placed on `device`.
    pub fn from_vec_on(data: Vec<f32>, shape: &[usize], device: Device) -> Result<Self> {
        if data.len() != numel(shape) {
            return Err(Error::shape_mismatch(&[data.len()], shape));
        }
        Ok(Self::from_parts(data, shape.to_vec(), device, false))
    }

    /// Creates a 0-dimensional tensor.
    pub fn scalar(value: f32) -> Self {
        Self::from_parts(vec![value], Vec::new(), Device::Cpu, false)
    }

    /// Creates a CPU tensor filled with zeros.
    pub fn zeros(shape: &[usize]) -> Self {
        Self::from_parts(vec![0.0; numel(shape)], shape.to_vec(), Device::Cpu, false)
    }

    /// Creates a CPU tensor filled with `value`.
    pub fn full(shape: &[usize], value: f32) -> Self {
        Self::from_parts(vec![value; numel(shape)], shape.to_vec(), Device::Cpu, false)
    }

    /// Creates a CPU tensor sampled from the standard normal distribution.
    pub fn randn(shape: &[usize]) -> Self {
        let mut rng = rand::thread_rng();
        let data = (0..numel(shape))
            .map(|_| rng.sample::<f32, _>(StandardNormal))
            .collect();
        Self::from_parts(data, shape.to_vec(), Device::Cpu, false)
    }

    /// Re-tags a freshly built tensor with a device.
    ///
    /// This does not copy; it is meant for construction chains only.
    pub fn placed_on(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Sets whether the tensor tracks gradients.
    pub fn with_requires_grad(mut self, requires_grad: bool) -> Self {
        self.requires_grad = requires_grad;
        self
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns the identity of this array instance.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the total number of elements.
    pub fn numel(&self) -> usize {
        numel(&self.shape)
    }

    /// Returns whether gradients are tracked.
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Returns the id of the manager this tensor is attached to.
    pub fn manager_id(&self) -> Option<u64> {
        *self.manager.read()
    }

    /// Returns a copy of the elements in row-major order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.read().clone()
    }

    /// Returns the single element of a one-element tensor.
    pub fn item(&self) -> Result<f32> {
        let data = self.data.read();
        if data.len() != 1 {
            return Err(Error::invalid_operation(format!(
                "item() requires exactly one element, tensor has {}",
                data.len()
            )));
        }
        Ok(data[0])
    }

    // =========================================================================
    // In-place Updates
    // =========================================================================

    /// Overwrites the elements with `values`.
    pub fn assign(&self, values: &[f32]) -> Result<()> {
        let mut data = self.data.write();
        if values.len() != data.len() {
            return Err(Error::shape_mismatch(&[data.len()], &[values.len()]));
        }
        data.copy_from_slice(values);
        Ok(())
    }

    /// Overwrites the elements with those of `source`.
    ///
    /// Shapes must match exactly. Copying a tensor onto an array that shares
    /// its storage is a no-op.
    pub fn copy_from(&self, source: &Tensor) -> Result<()> {
        if self.shape != source.shape {
            return Err(Error::shape_mismatch(&self.shape, &source.shape));
        }
        if Arc::ptr_eq(&self.data, &source.data) {
            return Ok(());
        }
        let values = source.to_vec();
        self.assign(&values)
    }

    /// Stores `grad` as this tensor's gradient.
    pub fn set_gradient(&self, grad: Tensor) -> Result<()> {
        if grad.shape != self.shape {
            return Err(Error::shape_mismatch(&self.shape, &grad.shape));
        }
        *self.grad.write() = Some(grad);
        Ok(())
    }

    /// Clears the gradient.
    pub fn zero_gradient(&self) {
        *self.grad.write() = None;
    }

    /// Binds this tensor to `manager`.
    pub(crate) fn attach_to(&self, manager: &ArrayManager) {
        *self.manager.write() = Some(manager.register_attachment());
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Gathers rows of a 2-D tensor.
    ///
    /// `indices` may have any shape; each element must be a non-negative
    /// integral value smaller than the number of rows. The result has shape
    /// `indices.shape() ++ [columns]` and is placed on this tensor's device.
    pub fn gather_rows(&self, indices: &Tensor) -> Result<Tensor> {
        if self.shape.len() != 2 {
            return Err(Error::invalid_operation(format!(
                "gather_rows requires a 2-D table, got shape {:?}",
                self.shape
            )));
        }
        let (rows, cols) = (self.shape[0], self.shape[1]);
        let idx = indices.to_vec();
        let table = self.data.read();

        let mut out = Vec::with_capacity(idx.len() * cols);
        for &value in &idx {
            if value < 0.0 || value.fract() != 0.0 {
                return Err(Error::invalid_operation(format!(
                    "row index {value} is not a non-negative integer"
                )));
            }
            let row = value as usize;
            if row >= rows {
                return Err(Error::IndexOutOfBounds {
                    index: row,
                    size: rows,
                });
            }
            out.extend_from_slice(&table[row * cols..(row + 1) * cols]);
        }

        let mut shape = indices.shape.clone();
        shape.push(cols);
        Ok(Self::from_parts(out, shape, self.device, self.requires_grad))
    }
}

// =============================================================================
// NdArray Implementation
// =============================================================================

impl NdArray for Tensor {
    fn device(&self) -> Device {
        self.device
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn to_device(&self, device: Device, requires_grad: bool) -> Result<Self> {
        Ok(Self::from_parts(
            self.to_vec(),
            self.shape.clone(),
            device,
            requires_grad,
        ))
    }

    fn gradient(&self) -> Option<Self> {
        self.grad.read().clone()
    }

    fn attach(&self, manager: &ArrayManager) {
        self.attach_to(manager);
    }

    fn reshape(&self, shape: &[usize]) -> Result<Self> {
        if numel(shape) != self.numel() {
            return Err(Error::shape_mismatch(&self.shape, shape));
        }
        Ok(Self {
            id: next_id(),
            data: Arc::clone(&self.data),
            shape: shape.to_vec(),
            device: self.device,
            requires_grad: self.requires_grad,
            grad: Arc::new(RwLock::new(None)),
            manager: Arc::clone(&self.manager),
        })
    }

    fn same_array(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("id", &self.id)
            .field("shape", &self.shape)
            .field("device", &self.device)
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}

// =============================================================================
// TensorData
// =============================================================================

/// Serializable snapshot of a tensor's shape and values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorData {
    /// Shape of the tensor.
    pub shape: Vec<usize>,
    /// Flattened f32 values.
    pub values: Vec<f32>,
}

impl TensorData {
    /// Captures the shape and values of a tensor.
    pub fn from_tensor(tensor: &Tensor) -> Self {
        Self {
            shape: tensor.shape.clone(),
            values: tensor.to_vec(),
        }
    }

    /// Builds a CPU tensor from the snapshot.
    pub fn to_tensor(&self) -> Result<Tensor> {
        Tensor::from_vec(self.values.clone(), &self.shape)
    }

    /// Returns the number of elements.
    pub fn numel(&self) -> usize {
        self.values.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
