//! LocalParameterServer - In-Process Parameter Server
//!
//! Keeps one master copy of every registered parameter. Gradients pushed
//! for a parameter are combined across device slots with a [`ReduceOp`];
//! the next pull applies a plain SGD step `w -= lr * g` to the master copy
//! and writes the result into every target replica.
//!
//! Requests are served synchronously in call order. Priorities are recorded
//! so callers can inspect the order they were assigned in.
//!
//! @version 0.1.0
//! @author Tessera Development Team

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::{debug, trace};

use tessera_core::{Error, Result};
use tessera_ndarray::{NdArray, Tensor};

use crate::reduce::ReduceOp;
use crate::server::ParameterServer;

// =============================================================================
// State
// =============================================================================

/// Master copy of one parameter.
#[derive(Debug)]
struct MasterEntry {
    shape: Vec<usize>,
    weight: Vec<f32>,
    pending_gradient: Option<Vec<f32>>,
}

/// Counters and priority logs of a [`LocalParameterServer`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerStats {
    /// Number of `init` calls received.
    pub init_calls: usize,
    /// `(parameter_id, priority)` for every push, in arrival order.
    pub pushes: Vec<(String, i32)>,
    /// `(parameter_id, priority)` for every pull, in arrival order.
    pub pulls: Vec<(String, i32)>,
}

#[derive(Debug, Default)]
struct ServerState {
    entries: HashMap<String, MasterEntry>,
    stats: ServerStats,
}

// =============================================================================
// LocalParameterServer
// =============================================================================

/// Parameter server running inside the training process.
#[derive(Debug)]
pub struct LocalParameterServer {
    learning_rate: f32,
    reduce: ReduceOp,
    state: Mutex<ServerState>,
}

impl LocalParameterServer {
    /// Creates a server applying SGD with `learning_rate` to gradients
    /// combined with `reduce`.
    pub fn new(learning_rate: f32, reduce: ReduceOp) -> Self {
        Self {
            learning_rate,
            reduce,
            state: Mutex::new(ServerState::default()),
        }
    }

    /// Returns the learning rate.
    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Returns the reduction used for pushed gradients.
    pub fn reduce_op(&self) -> ReduceOp {
        self.reduce
    }

    /// Returns the number of registered parameters.
    pub fn num_parameters(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns the master copy of a parameter.
    pub fn weight(&self, parameter_id: &str) -> Option<Vec<f32>> {
        self.state
            .lock()
            .entries
            .get(parameter_id)
            .map(|e| e.weight.clone())
    }

    /// Returns a snapshot of the counters and priority logs.
    pub fn stats(&self) -> ServerStats {
        self.state.lock().stats.clone()
    }
}

fn check_shapes(parameter_id: &str, expected: &[usize], arrays: &[Tensor]) -> Result<()> {
    for array in arrays {
        if array.shape() != expected {
            return Err(Error::parameter_server(format!(
                "parameter '{parameter_id}': shape {:?} does not match {:?}",
                array.shape(),
                expected
            )));
        }
    }
    Ok(())
}

impl ParameterServer<Tensor> for LocalParameterServer {
    fn name(&self) -> &str {
        "local"
    }

    fn init(&self, parameter_id: &str, arrays: &[Tensor]) -> Result<()> {
        let first = arrays.first().ok_or_else(|| {
            Error::parameter_server(format!("parameter '{parameter_id}': init with no arrays"))
        })?;
        check_shapes(parameter_id, first.shape(), arrays)?;

        let mut state = self.state.lock();
        state.stats.init_calls += 1;
        if let Some(existing) = state.entries.get(parameter_id) {
            return check_shapes(parameter_id, &existing.shape, arrays);
        }

        debug!(parameter_id, replicas = arrays.len(), "registering parameter");
        state.entries.insert(
            parameter_id.to_string(),
            MasterEntry {
                shape: first.shape().to_vec(),
                weight: first.to_vec(),
                pending_gradient: None,
            },
        );
        Ok(())
    }

    fn push(&self, parameter_id: &str, gradients: &[Tensor], priority: i32) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state.entries.get_mut(parameter_id).ok_or_else(|| {
            Error::parameter_server(format!("push for unregistered parameter '{parameter_id}'"))
        })?;
        check_shapes(parameter_id, &entry.shape, gradients)?;

        let slices: Vec<Vec<f32>> = gradients.iter().map(Tensor::to_vec).collect();
        let reduced = self.reduce.reduce_slices(&slices);
        entry.pending_gradient = Some(match entry.pending_gradient.take() {
            Some(previous) => previous.iter().zip(&reduced).map(|(a, b)| a + b).collect(),
            None => reduced,
        });

        trace!(parameter_id, priority, "push");
        state.stats.pushes.push((parameter_id.to_string(), priority));
        Ok(())
    }

    fn pull(&self, parameter_id: &str, targets: &[Tensor], priority: i32) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state.entries.get_mut(parameter_id).ok_or_else(|| {
            Error::parameter_server(format!("pull for unregistered parameter '{parameter_id}'"))
        })?;
        check_shapes(parameter_id, &entry.shape, targets)?;

        if let Some(grad) = entry.pending_gradient.take() {
            for (w, g) in entry.weight.iter_mut().zip(&grad) {
                *w -= self.learning_rate * g;
            }
        }
        for target in targets {
            target.assign(&entry.weight)?;
        }

        trace!(parameter_id, priority, "pull");
        state.stats.pulls.push((parameter_id.to_string(), priority));
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::Device;

    fn replicas(values: &[f32]) -> Vec<Tensor> {
        let base = Tensor::from_vec(values.to_vec(), &[values.len()]).unwrap();
        vec![
            base.clone(),
            base.to_device(Device::Gpu(1), true).unwrap(),
        ]
    }

    #[test]
    fn test_init_is_idempotent() {
        let server = LocalParameterServer::new(0.1, ReduceOp::Sum);
        let arrays = replicas(&[1.0, 2.0]);
        server.init("w", &arrays).unwrap();
        server.init("w", &arrays).unwrap();

        assert_eq!(server.num_parameters(), 1);
        assert_eq!(server.stats().init_calls, 2);
        assert_eq!(server.weight("w"), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn test_init_rejects_empty_and_mismatched() {
        let server = LocalParameterServer::new(0.1, ReduceOp::Sum);
        assert!(server.init("w", &[]).is_err());

        let mixed = vec![Tensor::zeros(&[2]), Tensor::zeros(&[3])];
        assert!(server.init("w", &mixed).is_err());
    }

    #[test]
    fn test_push_pull_applies_sgd() {
        let server = LocalParameterServer::new(0.5, ReduceOp::Average);
        let arrays = replicas(&[1.0, 1.0]);
        server.init("w", &arrays).unwrap();

        let grads = vec![
            Tensor::from_vec(vec![1.0, 0.0], &[2]).unwrap(),
            Tensor::from_vec(vec![3.0, 2.0], &[2]).unwrap(),
        ];
        server.push("w", &grads, 0).unwrap();
        server.pull("w", &arrays, 0).unwrap();

        // average gradient [2, 1], lr 0.5
        assert_eq!(arrays[0].to_vec(), vec![0.0, 0.5]);
        assert_eq!(arrays[1].to_vec(), vec![0.0, 0.5]);
        assert_eq!(server.weight("w"), Some(vec![0.0, 0.5]));
    }

    #[test]
    fn test_pull_without_push_broadcasts_master() {
        let server = LocalParameterServer::new(0.5, ReduceOp::Sum);
        let arrays = replicas(&[4.0, 5.0]);
        server.init("w", &arrays).unwrap();

        arrays[1].assign(&[0.0, 0.0]).unwrap();
        server.pull("w", &arrays, 0).unwrap();
        assert_eq!(arrays[1].to_vec(), vec![4.0, 5.0]);
    }

    #[test]
    fn test_unregistered_parameter_fails() {
        let server = LocalParameterServer::new(0.5, ReduceOp::Sum);
        let grads = vec![Tensor::zeros(&[2])];
        assert!(matches!(
            server.push("missing", &grads, 0),
            Err(Error::ParameterServer { .. })
        ));
        assert!(server.pull("missing", &grads, 0).is_err());
    }

    #[test]
    fn test_priorities_are_recorded() {
        let server = LocalParameterServer::new(0.1, ReduceOp::Sum);
        server.init("a", &replicas(&[0.0])).unwrap();
        server.init("b", &replicas(&[0.0])).unwrap();
        let grads = replicas(&[1.0]);

        server.push("a", &grads, 0).unwrap();
        server.push("b", &grads, -1).unwrap();
        server.pull("a", &grads, 0).unwrap();

        let stats = server.stats();
        assert_eq!(
            stats.pushes,
            vec![("a".to_string(), 0), ("b".to_string(), -1)]
        );
        assert_eq!(stats.pulls, vec![("a".to_string(), 0)]);
    }
}
