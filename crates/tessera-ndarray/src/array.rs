//! NdArray Trait - Engine-Agnostic Array Capabilities
//!
//! Everything the parameter store needs from an array engine. Copies are
//! always independent of their source; gradient tracking is opted into at
//! transfer time.
//!
//! @version 0.1.0
//! @author Tessera Development Team

use tessera_core::{Device, Result};

use crate::manager::ArrayManager;

// =============================================================================
// NdArray Trait
// =============================================================================

/// Capabilities the parameter store and layers require from an array type.
///
/// Cloning an `NdArray` yields another handle to the *same* array (shared
/// data and gradient), the way a reference-counted tensor handle behaves.
/// Use [`NdArray::to_device`] for an independent copy.
pub trait NdArray: Clone + Send + Sync + 'static {
    /// Returns the device the array lives on.
    fn device(&self) -> Device;

    /// Returns the array's dimensions.
    fn shape(&self) -> &[usize];

    /// Copies the array to `device`.
    ///
    /// The result never shares data with `self`, even when `device` equals
    /// the current device. `requires_grad` controls whether the copy tracks
    /// gradients.
    fn to_device(&self, device: Device, requires_grad: bool) -> Result<Self>;

    /// Returns the gradient accumulated for this array, if any.
    fn gradient(&self) -> Option<Self>;

    /// Binds the array's lifetime to an allocation context.
    fn attach(&self, manager: &ArrayManager);

    /// Returns an array with the same data and a new shape.
    fn reshape(&self, shape: &[usize]) -> Result<Self>;

    /// Returns true if both handles refer to the same array instance.
    fn same_array(&self, other: &Self) -> bool;

    /// Returns the number of dimensions.
    fn ndim(&self) -> usize {
        self.shape().len()
    }
}
