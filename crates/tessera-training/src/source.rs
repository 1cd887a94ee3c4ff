//! ParameterSource - What the Store Needs From a Parameter
//!
//! @version 0.1.0
//! @author Tessera Development Team

use tessera_core::Result;
use tessera_ndarray::NdArray;

/// A named, learnable array that can be materialized by a
/// [`ParameterStore`](crate::ParameterStore).
pub trait ParameterSource {
    /// Array type of the canonical value.
    type Array: NdArray;

    /// Stable identifier, unique per parameter instance.
    fn id(&self) -> &str;

    /// Whether the parameter is trainable.
    ///
    /// The store reads this once, on first touch.
    fn requires_grad(&self) -> bool;

    /// Returns a handle to the canonical array.
    fn array(&self) -> Result<Self::Array>;
}
