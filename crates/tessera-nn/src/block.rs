//! Block Trait - Neural Network Block Interface
//!
//! Blocks own parameters and compute outputs from inputs. Parameter values
//! are always fetched through a [`ParameterStore`] so that a block runs
//! unchanged on one device or on many.
//!
//! @version 0.1.0
//! @author Tessera Development Team

use std::io::{Read, Write};

use tessera_core::Result;
use tessera_ndarray::{ArrayManager, Tensor};
use tessera_training::ParameterStore;

use crate::parameter::Parameter;

// =============================================================================
// Block Trait
// =============================================================================

/// Core trait for all neural network blocks.
pub trait Block: Send + Sync {
    /// Performs the forward pass.
    fn forward(&self, store: &ParameterStore<Tensor>, inputs: &[Tensor]) -> Result<Vec<Tensor>>;

    /// Shapes of the outputs produced for inputs of `input_shapes`.
    fn output_shapes(&self, input_shapes: &[Vec<usize>]) -> Result<Vec<Vec<usize>>>;

    /// Parameters owned by this block itself.
    fn direct_parameters(&self) -> Vec<&Parameter>;

    /// Shape of the parameter called `name` for inputs of `input_shapes`.
    fn parameter_shape(&self, name: &str, input_shapes: &[Vec<usize>]) -> Result<Vec<usize>>;

    /// Writes the block's parameters.
    fn save_parameters(&self, writer: &mut dyn Write) -> Result<()>;

    /// Reads parameters written by [`save_parameters`](Self::save_parameters).
    fn load_parameters(&self, manager: &ArrayManager, reader: &mut dyn Read) -> Result<()>;

    /// Creates every uninitialized direct parameter.
    fn initialize(&self, input_shapes: &[Vec<usize>]) -> Result<()> {
        for parameter in self.direct_parameters() {
            if !parameter.is_initialized() {
                let shape = self.parameter_shape(parameter.name(), input_shapes)?;
                parameter.initialize(&shape)?;
            }
        }
        Ok(())
    }

    /// Returns true once every direct parameter has an array.
    fn is_initialized(&self) -> bool {
        self.direct_parameters()
            .iter()
            .all(|p| p.is_initialized())
    }

    /// Returns the number of trainable elements.
    fn num_parameters(&self) -> usize {
        use tessera_training::ParameterSource;

        self.direct_parameters()
            .iter()
            .filter(|p| p.requires_grad())
            .map(|p| p.numel())
            .sum()
    }

    /// Returns the block name.
    fn name(&self) -> &'static str {
        "Block"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::Error;

    use crate::parameter::ParameterType;

    struct Scale {
        gamma: Parameter,
        beta: Parameter,
    }

    impl Block for Scale {
        fn forward(&self, _: &ParameterStore<Tensor>, inputs: &[Tensor]) -> Result<Vec<Tensor>> {
            Ok(inputs.to_vec())
        }

        fn output_shapes(&self, input_shapes: &[Vec<usize>]) -> Result<Vec<Vec<usize>>> {
            Ok(input_shapes.to_vec())
        }

        fn direct_parameters(&self) -> Vec<&Parameter> {
            vec![&self.gamma, &self.beta]
        }

        fn parameter_shape(&self, name: &str, input_shapes: &[Vec<usize>]) -> Result<Vec<usize>> {
            match (name, input_shapes.first()) {
                ("gamma" | "beta", Some(shape)) => Ok(vec![*shape.last().unwrap_or(&1)]),
                _ => Err(Error::invalid_operation(format!("no parameter '{name}'"))),
            }
        }

        fn save_parameters(&self, writer: &mut dyn Write) -> Result<()> {
            self.gamma.save(writer)?;
            self.beta.save(writer)
        }

        fn load_parameters(&self, manager: &ArrayManager, reader: &mut dyn Read) -> Result<()> {
            self.gamma.load(manager, reader)?;
            self.beta.load(manager, reader)
        }
    }

    fn scale() -> Scale {
        Scale {
            gamma: Parameter::new("gamma", ParameterType::Gamma),
            beta: Parameter::new("beta", ParameterType::Beta),
        }
    }

    #[test]
    fn test_default_initialize() {
        let block = scale();
        assert!(!block.is_initialized());
        block.initialize(&[vec![2, 3]]).unwrap();

        assert!(block.is_initialized());
        assert_eq!(block.gamma.shape(), Some(vec![3]));
        assert_eq!(block.num_parameters(), 6);
        assert_eq!(block.name(), "Block");
    }

    #[test]
    fn test_initialize_requires_input_shape() {
        let block = scale();
        assert!(block.initialize(&[]).is_err());
        assert!(!block.is_initialized());
    }

    #[test]
    fn test_save_load_through_trait_object() {
        let block = scale();
        block.initialize(&[vec![4]]).unwrap();
        let mut bytes = Vec::new();
        let boxed: &dyn Block = &block;
        boxed.save_parameters(&mut bytes).unwrap();

        let restored = scale();
        let manager = ArrayManager::new(tessera_core::Device::Cpu);
        restored
            .load_parameters(&manager, &mut bytes.as_slice())
            .unwrap();
        assert_eq!(restored.gamma.try_array().unwrap().to_vec(), vec![1.0; 4]);
        assert_eq!(restored.beta.try_array().unwrap().to_vec(), vec![0.0; 4]);
    }
}
