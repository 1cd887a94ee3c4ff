//! ParameterServer - Distributed Synchronization Seam
//!
//! @version 0.1.0
//! @author Tessera Development Team

use tessera_core::Result;
use tessera_ndarray::NdArray;

// =============================================================================
// ParameterServer Trait
// =============================================================================

/// Backend responsible for cross-device gradient aggregation and value
/// broadcast.
///
/// Array lists are always ordered by device slot. Priorities are relative:
/// a lower (more negative) value asks the server to schedule that request
/// after ones with higher values. Scheduling itself is the server's business.
pub trait ParameterServer<A: NdArray>: Send + Sync {
    /// Returns the name of the server implementation.
    fn name(&self) -> &str {
        "parameter-server"
    }

    /// Registers the initial per-slot values of a parameter.
    ///
    /// Called once per device slot, in slot order, with the complete list.
    fn init(&self, parameter_id: &str, arrays: &[A]) -> Result<()>;

    /// Submits one gradient per device slot.
    fn push(&self, parameter_id: &str, gradients: &[A], priority: i32) -> Result<()>;

    /// Writes the current value of a parameter into every target, in place.
    fn pull(&self, parameter_id: &str, targets: &[A], priority: i32) -> Result<()>;
}
