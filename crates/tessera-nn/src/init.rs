//! Weight Initialization - Parameter Initialization Strategies
//!
//! Free functions producing freshly initialized CPU tensors, plus the
//! [`Initializer`] enum a [`Parameter`](crate::Parameter) stores to build its
//! array once its shape is known.
//!
//! @version 0.1.0
//! @author Tessera Development Team

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use tessera_core::{Error, Result};
use tessera_ndarray::Tensor;

// =============================================================================
// Basic Initializers
// =============================================================================

/// Creates a tensor filled with zeros.
pub fn zeros(shape: &[usize]) -> Tensor {
    Tensor::zeros(shape)
}

/// Creates a tensor filled with ones.
pub fn ones(shape: &[usize]) -> Tensor {
    Tensor::full(shape, 1.0)
}

/// Creates a tensor filled with a constant value.
pub fn constant(shape: &[usize], value: f32) -> Tensor {
    Tensor::full(shape, value)
}

// =============================================================================
// Random Initializers
// =============================================================================

fn from_samples(shape: &[usize], samples: impl Iterator<Item = f32>) -> Result<Tensor> {
    let numel: usize = shape.iter().product();
    Tensor::from_vec(samples.take(numel).collect(), shape)
}

/// Creates a tensor with uniform random values in [low, high).
pub fn uniform_range(shape: &[usize], low: f32, high: f32) -> Result<Tensor> {
    if !(low < high) {
        return Err(Error::invalid_operation(format!(
            "uniform range [{low}, {high}) is empty"
        )));
    }
    let mut rng = rand::thread_rng();
    from_samples(shape, std::iter::repeat_with(|| rng.gen_range(low..high)))
}

/// Creates a tensor with normal random values (specified mean and std).
pub fn normal(shape: &[usize], mean: f32, std: f32) -> Result<Tensor> {
    let dist = Normal::new(mean, std)
        .map_err(|e| Error::invalid_operation(format!("normal({mean}, {std}): {e}")))?;
    let mut rng = rand::thread_rng();
    from_samples(shape, std::iter::repeat_with(|| dist.sample(&mut rng)))
}

/// Fan-in and fan-out of a weight shape `[fan_out, fan_in...]`.
fn fans(shape: &[usize]) -> (usize, usize) {
    match shape {
        [] => (1, 1),
        [n] => (*n, *n),
        [fan_out, rest @ ..] => (rest.iter().product(), *fan_out),
    }
}

/// Xavier uniform initialization for an arbitrary weight shape.
///
/// Samples from U(-a, a) where a = sqrt(6 / (fan_in + fan_out)).
pub fn xavier_uniform(shape: &[usize]) -> Result<Tensor> {
    let (fan_in, fan_out) = fans(shape);
    let a = (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
    uniform_range(shape, -a, a)
}

// =============================================================================
// Initializer Enum
// =============================================================================

/// Initialization strategies as an enum for dynamic selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Initializer {
    /// Zeros initialization.
    Zeros,
    /// Ones initialization.
    Ones,
    /// Constant value initialization.
    Constant(f32),
    /// Uniform random in range.
    UniformRange(f32, f32),
    /// Normal distribution.
    Normal(f32, f32), // mean, std
    /// Xavier/Glorot uniform.
    XavierUniform,
}

impl Initializer {
    /// Builds a tensor of `shape` using this strategy.
    pub fn init(&self, shape: &[usize]) -> Result<Tensor> {
        match *self {
            Initializer::Zeros => Ok(zeros(shape)),
            Initializer::Ones => Ok(ones(shape)),
            Initializer::Constant(value) => Ok(constant(shape, value)),
            Initializer::UniformRange(low, high) => uniform_range(shape, low, high),
            Initializer::Normal(mean, std) => normal(shape, mean, std),
            Initializer::XavierUniform => xavier_uniform(shape),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
