//! End-to-end tests for the parameter store, the in-process server and the
//! embedding layer working together.

use std::io::{Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tessera::prelude::*;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("tessera_training=trace,tessera_distributed=debug,tessera_nn=debug")
        .try_init();
}

fn animals() -> Embedding<&'static str> {
    let embedding = Embedding::new(EmbeddingConfig::new(vec!["cat", "dog"], 2)).unwrap();
    embedding
        .weight()
        .set_array(Tensor::from_vec(vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0], &[3, 2]).unwrap());
    embedding
}

fn lookup(
    embedding: &Embedding<&'static str>,
    store: &ParameterStore,
    item: &'static str,
    device: Device,
) -> Tensor {
    let row = embedding.embed(&item).unwrap();
    let indices = Tensor::from_vec_on(vec![row as f32], &[], device).unwrap();
    embedding.forward(store, &[indices]).unwrap().remove(0)
}

/// Test 1: A full data-parallel step over two devices
#[test]
fn test_two_device_training_step() {
    init_logging();
    let manager = Arc::new(ArrayManager::new(Device::Cpu));
    let store: ParameterStore = ParameterStore::new(Arc::clone(&manager), false);
    let server = Arc::new(LocalParameterServer::new(0.5, ReduceOp::Sum));
    store
        .configure_distributed(server.clone(), &[Device::Gpu(0), Device::Gpu(1)])
        .unwrap();

    let embedding = animals();
    let weight_id = embedding.weight().id().to_string();

    // first touch from the second device
    let dog = lookup(&embedding, &store, "dog", Device::Gpu(1));
    let cat = lookup(&embedding, &store, "cat", Device::Gpu(0));
    assert_eq!(dog.to_vec(), vec![2.0, 2.0]);
    assert_eq!(cat.to_vec(), vec![1.0, 1.0]);
    assert_eq!(server.stats().init_calls, 2);

    for device in [Device::Gpu(0), Device::Gpu(1)] {
        let replica = store.get_value(embedding.weight(), device).unwrap();
        replica.set_gradient(Tensor::full(&[3, 2], 1.0)).unwrap();
    }
    store.synchronize_all().unwrap();

    // summed gradient 2.0, learning rate 0.5
    let expected = vec![-1.0, -1.0, 0.0, 0.0, 1.0, 1.0];
    for device in [Device::Gpu(0), Device::Gpu(1)] {
        let replica = store.get_value(embedding.weight(), device).unwrap();
        assert_eq!(replica.to_vec(), expected);
    }
    assert_eq!(embedding.weight().array().unwrap().to_vec(), expected);
    assert_eq!(server.weight(&weight_id), Some(expected));
    let fish = lookup(&embedding, &store, "fish", Device::Gpu(0));
    assert_eq!(fish.to_vec(), vec![-1.0, -1.0]);

    let stats = server.stats();
    assert_eq!(stats.pushes, vec![(weight_id.clone(), 0)]);
    assert_eq!(stats.pulls, vec![(weight_id, 0)]);
}

/// Test 2: Frozen parameters never reach the server
#[test]
fn test_frozen_parameters_are_skipped() {
    init_logging();
    let config = StoreConfig::distributed(vec![Device::Gpu(0), Device::Gpu(1), Device::Gpu(2)]);
    let store =
        ParameterStore::from_config(Arc::new(ArrayManager::new(Device::Cpu)), &config).unwrap();

    let trainable = Parameter::new("weight", ParameterType::Weight);
    trainable.initialize(&[4, 4]).unwrap();
    let frozen = Parameter::new("table", ParameterType::Weight).with_requires_grad(false);
    frozen.initialize(&[8]).unwrap();
    let stats = Parameter::new("mean", ParameterType::RunningMean);
    stats.initialize(&[4]).unwrap();

    for device in [Device::Gpu(0), Device::Gpu(1), Device::Gpu(2)] {
        store.get_value(&frozen, device).unwrap();
        store.get_value(&stats, device).unwrap();
        let replica = store.get_value(&trainable, device).unwrap();
        replica.set_gradient(Tensor::zeros(&[4, 4])).unwrap();
    }
    store.synchronize_all().unwrap();

    assert_eq!(store.len(), 3);
    assert_eq!(
        store.status(frozen.id()),
        Some(ReplicaStatus::Materialized {
            replicas: 3,
            requires_grad: false
        })
    );
}

/// Test 3: Concurrent forward passes on every device share one replica set
#[test]
fn test_concurrent_forward_passes() {
    init_logging();
    let devices: Vec<Device> = (0..4).map(Device::Gpu).collect();
    let store: ParameterStore =
        ParameterStore::new(Arc::new(ArrayManager::new(Device::Cpu)), false);
    let server = Arc::new(LocalParameterServer::new(0.1, ReduceOp::Average));
    store.configure_distributed(server.clone(), &devices).unwrap();
    let embedding = animals();

    let outputs: Vec<Vec<f32>> = std::thread::scope(|s| {
        let handles: Vec<_> = devices
            .iter()
            .map(|&device| {
                let (store, embedding) = (&store, &embedding);
                s.spawn(move || lookup(embedding, store, "dog", device).to_vec())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(outputs.iter().all(|o| o == &vec![2.0, 2.0]));
    assert_eq!(server.stats().init_calls, devices.len());
    assert_eq!(server.num_parameters(), 1);
    assert_eq!(store.manager().attached_count(), devices.len() - 1);
}

/// Test 4: Store configuration read from disk
#[test]
fn test_store_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "copy = true").unwrap();
    file.flush().unwrap();

    let config = StoreConfig::load(file.path()).unwrap();
    let store =
        ParameterStore::from_config(Arc::new(ArrayManager::new(Device::Cpu)), &config).unwrap();
    assert!(store.is_copy());

    let embedding = animals();
    let output = lookup(&embedding, &store, "cat", Device::Cpu);
    assert_eq!(output.to_vec(), vec![1.0, 1.0]);
    let replica = store.get_value(embedding.weight(), Device::Cpu).unwrap();
    assert!(!replica.same_array(&embedding.weight().array().unwrap()));
    assert_eq!(store.synchronize_all(), Err(Error::NoParameterServer));
}

/// Test 5: Embedding weights survive a save and reload through a file
#[test]
fn test_embedding_checkpoint() {
    let manager = ArrayManager::new(Device::Cpu);
    let source = animals();
    let mut file = tempfile::tempfile().unwrap();
    source.save_parameters(&mut file).unwrap();

    let target = Embedding::new(EmbeddingConfig::new(vec!["cat", "dog"], 2)).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    target.load_parameters(&manager, &mut file).unwrap();
    assert_eq!(
        target.weight().array().unwrap().to_vec(),
        vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]
    );

    let mut bytes = Vec::new();
    source.save_parameters(&mut bytes).unwrap();
    bytes[0] = 2;
    let untouched = animals();
    assert!(matches!(
        untouched.load_parameters(&manager, &mut bytes.as_slice()),
        Err(Error::UnsupportedVersion { found: 2, .. })
    ));
    assert_eq!(
        untouched.weight().array().unwrap().to_vec(),
        vec![0.0, 0.0, 1.0, 1.0, 2.0, 2.0]
    );
}

/// Test 6: A failed server registration blocks the parameter until reset
#[test]
fn test_poisoned_parameter_recovers_after_reset() {
    struct FlakyServer {
        inner: LocalParameterServer,
        failures: AtomicUsize,
    }

    impl ParameterServer<Tensor> for FlakyServer {
        fn init(&self, parameter_id: &str, arrays: &[Tensor]) -> Result<()> {
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(Error::parameter_server("connection reset"));
            }
            self.inner.init(parameter_id, arrays)
        }

        fn push(&self, parameter_id: &str, gradients: &[Tensor], priority: i32) -> Result<()> {
            self.inner.push(parameter_id, gradients, priority)
        }

        fn pull(&self, parameter_id: &str, targets: &[Tensor], priority: i32) -> Result<()> {
            self.inner.pull(parameter_id, targets, priority)
        }
    }

    init_logging();
    let store: ParameterStore =
        ParameterStore::new(Arc::new(ArrayManager::new(Device::Cpu)), false);
    let server = Arc::new(FlakyServer {
        inner: LocalParameterServer::new(0.1, ReduceOp::Sum),
        failures: AtomicUsize::new(1),
    });
    store
        .configure_distributed(server, &[Device::Gpu(0), Device::Gpu(1)])
        .unwrap();

    let embedding = animals();
    let indices = Tensor::from_vec_on(vec![1.0], &[1], Device::Gpu(0)).unwrap();
    assert!(matches!(
        embedding.forward(&store, &[indices.clone()]),
        Err(Error::ParameterServer { .. })
    ));
    assert!(matches!(
        embedding.forward(&store, &[indices.clone()]),
        Err(Error::PoisonedEntry { .. })
    ));

    assert!(store.reset_entry(embedding.weight().id()));
    let output = embedding.forward(&store, &[indices]).unwrap();
    assert_eq!(output[0].to_vec(), vec![1.0, 1.0]);
}
