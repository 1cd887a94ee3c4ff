//! ArrayManager - Allocation Context
//!
//! An `ArrayManager` is the authority arrays are created by and bound to.
//! The parameter store owns one and attaches every replica it creates to it,
//! so replicas share the store's lifetime rather than the caller's.
//!
//! @version 0.1.0
//! @author Tessera Development Team

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tessera_core::{Device, Result};

use crate::tensor::Tensor;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a process-wide unique identifier.
pub(crate) fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

// =============================================================================
// ArrayManager
// =============================================================================

/// Allocation context that arrays are created by or attached to.
#[derive(Debug)]
pub struct ArrayManager {
    id: u64,
    name: String,
    device: Device,
    attached: AtomicUsize,
}

impl ArrayManager {
    /// Creates a manager allocating on `device`.
    pub fn new(device: Device) -> Self {
        Self::named(format!("manager-{device}"), device)
    }

    /// Creates a manager with a descriptive name.
    pub fn named(name: impl Into<String>, device: Device) -> Self {
        Self {
            id: next_id(),
            name: name.into(),
            device,
            attached: AtomicUsize::new(0),
        }
    }

    /// Returns the unique identifier of this manager.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the manager's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the default device arrays are created on.
    pub fn device(&self) -> Device {
        self.device
    }

    /// Returns how many arrays have been attached to this manager.
    pub fn attached_count(&self) -> usize {
        self.attached.load(Ordering::Acquire)
    }

    /// Records one attachment and returns the manager id to store on the array.
    ///
    /// Array engines outside this crate call this from their
    /// [`NdArray::attach`](crate::NdArray::attach) implementation.
    pub fn register_attachment(&self) -> u64 {
        self.attached.fetch_add(1, Ordering::AcqRel);
        self.id
    }

    /// Creates an attached array on this manager's device.
    pub fn create(&self, data: Vec<f32>, shape: &[usize]) -> Result<Tensor> {
        let tensor = Tensor::from_vec_on(data, shape, self.device)?;
        tensor.attach_to(self);
        Ok(tensor)
    }

    /// Creates an attached zero-filled array on this manager's device.
    pub fn zeros(&self, shape: &[usize]) -> Tensor {
        let tensor = Tensor::zeros(shape).placed_on(self.device);
        tensor.attach_to(self);
        tensor
    }
}

// =============================================================================
// Tests
// =============================================================================
