//! ParameterStore - Per-Device Parameter Replicas
//!
//! Layers ask the store for a parameter's value on a device. The first
//! request for a parameter id places its replicas; every later request is a
//! lookup. In distributed mode the store also drives gradient push/pull
//! through a [`ParameterServer`].
//!
//! # Locking
//! Lock order is placement configuration, then table, then entry. The table
//! lock is held only to find or insert an entry; placement runs under the
//! entry's own mutex, so different ids place concurrently while requests for
//! the same id wait for the first one to finish.
//!
//! @version 0.1.0
//! @author Tessera Development Team

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};

use tessera_core::{Device, Error, Result};
use tessera_distributed::{LocalParameterServer, ParameterServer};
use tessera_ndarray::{ArrayManager, NdArray, Tensor};

use crate::config::StoreConfig;
use crate::registry::DeviceRegistry;
use crate::replica::{ReplicaState, ReplicaStatus, ReplicaTable, SharedEntry};
use crate::source::ParameterSource;

// =============================================================================
// Placement Configuration
// =============================================================================

/// Registered devices plus the optional server; replaced as a unit.
struct Placement<A: NdArray> {
    registry: DeviceRegistry,
    server: Option<Arc<dyn ParameterServer<A>>>,
}

// =============================================================================
// ParameterStore
// =============================================================================

/// Owner of every per-device parameter replica of a training session.
pub struct ParameterStore<A: NdArray = Tensor> {
    manager: Arc<ArrayManager>,
    copy: bool,
    placement: RwLock<Placement<A>>,
    table: RwLock<ReplicaTable<A>>,
}

impl<A: NdArray> ParameterStore<A> {
    /// Creates a store in local mode on the manager's device.
    ///
    /// With `copy` set, local-mode replicas are always copies of the
    /// canonical array even when it already lives on the requested device.
    pub fn new(manager: Arc<ArrayManager>, copy: bool) -> Self {
        let registry = DeviceRegistry::single(manager.device());
        Self {
            manager,
            copy,
            placement: RwLock::new(Placement {
                registry,
                server: None,
            }),
            table: RwLock::new(ReplicaTable::new()),
        }
    }

    // =========================================================================
    // Device Configuration
    // =========================================================================

    /// Switches to local mode with `device` as the only slot.
    ///
    /// Drops the server and clears every replica entry.
    pub fn register_single_device(&self, device: Device) {
        let mut placement = self.placement.write();
        placement.registry = DeviceRegistry::single(device);
        placement.server = None;
        let cleared = self.clear_table();
        info!(%device, cleared, "parameter store switched to single device");
    }

    /// Switches to distributed mode over `devices`, in slot order.
    ///
    /// The device list must be non-empty and distinct; on error nothing
    /// changes. On success every replica entry is cleared, since existing
    /// replica lists were built for the previous slot layout.
    pub fn configure_distributed(
        &self,
        server: Arc<dyn ParameterServer<A>>,
        devices: &[Device],
    ) -> Result<()> {
        let registry = DeviceRegistry::from_devices(devices)?;

        let mut placement = self.placement.write();
        placement.registry = registry;
        let server_name = server.name().to_string();
        placement.server = Some(server);
        let cleared = self.clear_table();
        info!(
            devices = devices.len(),
            server = %server_name,
            cleared,
            "parameter store configured for distributed training"
        );
        Ok(())
    }

    fn clear_table(&self) -> usize {
        let mut table = self.table.write();
        let cleared = table.len();
        table.clear();
        cleared
    }

    // =========================================================================
    // Value Lookup
    // =========================================================================

    /// Returns the value of `parameter` on `device`.
    ///
    /// The first call for a parameter id materializes its replicas. In
    /// distributed mode the requesting slot receives the canonical array
    /// itself and every other slot a gradient-tracking copy bound to this
    /// store's manager; the server's `init` is then called once per slot
    /// with the full list. In local mode the canonical array is reused
    /// unless the store copies or the array lives on another device.
    ///
    /// If the server's `init` fails the entry is poisoned: this and every
    /// later call for the id fail until [`reset_entry`](Self::reset_entry)
    /// or [`clear`](Self::clear).
    pub fn get_value<P>(&self, parameter: &P, device: Device) -> Result<A>
    where
        P: ParameterSource<Array = A> + ?Sized,
    {
        let placement = self.placement.read();
        let slot = placement.registry.slot_of(device)?;
        let parameter_id = parameter.id();

        let entry = self.entry_for(parameter_id, || parameter.requires_grad());
        let mut entry = entry.lock();

        if let Some(replicas) = entry.replicas(parameter_id)? {
            return replica_at(replicas, parameter_id, slot);
        }

        let canonical = parameter.array()?;
        let replicas = match &placement.server {
            Some(server) => {
                let replicas = self.place_distributed(&placement.registry, &canonical, slot)?;
                for _ in 0..replicas.len() {
                    if let Err(e) = server.init(parameter_id, &replicas) {
                        warn!(parameter_id, error = %e, "server init failed, entry poisoned");
                        entry.state = ReplicaState::Poisoned(e.to_string());
                        return Err(e);
                    }
                }
                replicas
            }
            None => vec![self.place_local(canonical, device)?],
        };

        debug!(
            parameter_id,
            %device,
            slot,
            replicas = replicas.len(),
            requires_grad = entry.requires_grad,
            "materialized parameter replicas"
        );
        let value = replica_at(&replicas, parameter_id, slot);
        entry.state = ReplicaState::Materialized(replicas);
        value
    }

    fn entry_for(&self, parameter_id: &str, requires_grad: impl FnOnce() -> bool) -> SharedEntry<A> {
        if let Some(entry) = self.table.read().get(parameter_id) {
            return entry;
        }
        self.table
            .write()
            .get_or_insert_with(parameter_id, requires_grad)
    }

    fn place_distributed(
        &self,
        registry: &DeviceRegistry,
        canonical: &A,
        requested_slot: usize,
    ) -> Result<Vec<A>> {
        registry
            .devices()
            .iter()
            .enumerate()
            .map(|(slot, &device)| {
                if slot == requested_slot {
                    Ok(canonical.clone())
                } else {
                    let copy = canonical.to_device(device, true)?;
                    copy.attach(&self.manager);
                    Ok(copy)
                }
            })
            .collect()
    }

    fn place_local(&self, canonical: A, device: Device) -> Result<A> {
        if self.copy || canonical.device() != device {
            let copy = canonical.to_device(device, true)?;
            copy.attach(&self.manager);
            Ok(copy)
        } else {
            Ok(canonical)
        }
    }

    // =========================================================================
    // Synchronization
    // =========================================================================

    /// Pushes gradients and pulls updated values for every trainable
    /// parameter touched so far.
    ///
    /// Entries are visited in first-touch order, twice: the push pass hands
    /// the server each entry's per-slot gradients with priorities 0, -1,
    /// -2, ...; the pull pass hands it the live replicas, with priorities
    /// counted again from 0, for in-place update. Entries captured as not
    /// requiring gradients are skipped in both passes.
    ///
    /// Fails with [`Error::NoParameterServer`] in local mode. Must not run
    /// concurrently with itself.
    pub fn synchronize_all(&self) -> Result<()> {
        let placement = self.placement.read();
        let server = placement
            .server
            .as_ref()
            .ok_or(Error::NoParameterServer)?;
        let snapshot = self.table.read().snapshot();

        let mut priority = 0;
        for (parameter_id, entry) in &snapshot {
            let entry = entry.lock();
            if !entry.requires_grad {
                continue;
            }
            let Some(replicas) = entry.replicas(parameter_id)? else {
                continue;
            };
            let gradients = replicas
                .iter()
                .enumerate()
                .map(|(slot, replica)| {
                    replica.gradient().ok_or_else(|| Error::MissingGradient {
                        parameter_id: parameter_id.clone(),
                        slot,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            trace!(parameter_id = %parameter_id, priority, "push");
            server.push(parameter_id, &gradients, priority)?;
            priority -= 1;
        }

        let mut priority = 0;
        for (parameter_id, entry) in &snapshot {
            let entry = entry.lock();
            if !entry.requires_grad {
                continue;
            }
            let Some(replicas) = entry.replicas(parameter_id)? else {
                continue;
            };
            trace!(parameter_id = %parameter_id, priority, "pull");
            server.pull(parameter_id, replicas, priority)?;
            priority -= 1;
        }

        Ok(())
    }

    // =========================================================================
    // Inspection and Maintenance
    // =========================================================================

    /// Returns the allocation context replicas are bound to.
    pub fn manager(&self) -> &Arc<ArrayManager> {
        &self.manager
    }

    /// Returns whether local mode always copies.
    pub fn is_copy(&self) -> bool {
        self.copy
    }

    /// Returns true when a parameter server is configured.
    pub fn is_distributed(&self) -> bool {
        self.placement.read().server.is_some()
    }

    /// Returns the registered devices in slot order.
    pub fn devices(&self) -> Vec<Device> {
        self.placement.read().registry.devices().to_vec()
    }

    /// Returns the number of device slots.
    pub fn device_count(&self) -> usize {
        self.placement.read().registry.len()
    }

    /// Returns the slot of `device`.
    pub fn slot_of(&self, device: Device) -> Result<usize> {
        self.placement.read().registry.slot_of(device)
    }

    /// Returns the configured server, if any.
    pub fn parameter_server(&self) -> Option<Arc<dyn ParameterServer<A>>> {
        self.placement.read().server.clone()
    }

    /// Returns the number of parameter ids touched.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Returns true if no parameter has been touched.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `parameter_id` has an entry.
    pub fn contains(&self, parameter_id: &str) -> bool {
        self.table.read().get(parameter_id).is_some()
    }

    /// Returns the state of the entry for `parameter_id`.
    pub fn status(&self, parameter_id: &str) -> Option<ReplicaStatus> {
        let entry = self.table.read().get(parameter_id)?;
        let status = entry.lock().status();
        Some(status)
    }

    /// Drops the entry for `parameter_id`; the next request places it again.
    pub fn reset_entry(&self, parameter_id: &str) -> bool {
        self.table.write().remove(parameter_id)
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.clear_table();
    }
}

impl ParameterStore<Tensor> {
    /// Builds a store from configuration.
    ///
    /// A `[distributed]` section installs a [`LocalParameterServer`] over the
    /// listed devices.
    pub fn from_config(manager: Arc<ArrayManager>, config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let store = Self::new(manager, config.copy);
        if let Some(distributed) = &config.distributed {
            let server: Arc<LocalParameterServer> = Arc::new(distributed.build_server());
            store.configure_distributed(server, &distributed.devices)?;
        }
        Ok(store)
    }
}

fn replica_at<A: NdArray>(replicas: &[A], parameter_id: &str, slot: usize) -> Result<A> {
    replicas.get(slot).cloned().ok_or_else(|| {
        Error::invalid_operation(format!(
            "parameter '{parameter_id}' has {} replicas, slot {slot} requested",
            replicas.len()
        ))
    })
}

impl<A: NdArray> fmt::Debug for ParameterStore<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterStore")
            .field("manager", &self.manager.name())
            .field("copy", &self.copy)
            .field("devices", &self.devices())
            .field("distributed", &self.is_distributed())
            .field("entries", &self.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
