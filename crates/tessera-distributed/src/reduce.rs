//! Reduce Operations - Combining Per-Device Values
//!
//! @version 0.1.0
//! @author Tessera Development Team

use serde::{Deserialize, Serialize};

// =============================================================================
// Reduce Operations
// =============================================================================

/// Reduction applied element-wise across per-device arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReduceOp {
    /// Sum all values.
    #[default]
    Sum,
    /// Compute product of all values.
    Product,
    /// Find minimum value.
    Min,
    /// Find maximum value.
    Max,
    /// Compute average of all values.
    Average,
}

impl ReduceOp {
    /// Applies the reduction operation to two f32 values.
    #[must_use]
    pub fn apply_f32(&self, a: f32, b: f32) -> f32 {
        match self {
            ReduceOp::Sum | ReduceOp::Average => a + b,
            ReduceOp::Product => a * b,
            ReduceOp::Min => a.min(b),
            ReduceOp::Max => a.max(b),
        }
    }

    /// Reduces equally sized slices element-wise.
    ///
    /// Returns an empty vector for no input. Elements past the length of the
    /// first slice are ignored.
    #[must_use]
    pub fn reduce_slices(&self, slices: &[Vec<f32>]) -> Vec<f32> {
        let Some(first) = slices.first() else {
            return Vec::new();
        };

        let mut result = first.clone();
        for slice in &slices[1..] {
            for (acc, &val) in result.iter_mut().zip(slice) {
                *acc = self.apply_f32(*acc, val);
            }
        }

        if *self == ReduceOp::Average {
            let count = slices.len() as f32;
            for val in &mut result {
                *val /= count;
            }
        }

        result
    }
}

// =============================================================================
// Tests
// =============================================================================
