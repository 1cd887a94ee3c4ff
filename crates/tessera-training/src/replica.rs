//! Replica Table - Per-Parameter Replica Records
//!
//! Each parameter id touched through the store owns one entry: the
//! "requires gradient" flag captured at first touch and the list of
//! per-device replicas, indexed by device slot. Entries sit behind their own
//! mutex so that placement for one id never blocks placement for another.
//!
//! @version 0.1.0
//! @author Tessera Development Team

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use tessera_core::{Error, Result};
use tessera_ndarray::NdArray;

// =============================================================================
// ReplicaEntry
// =============================================================================

/// Materialization state of an entry.
#[derive(Debug)]
pub(crate) enum ReplicaState<A> {
    /// Created, no replicas yet.
    Pending,
    /// Replicas in slot order.
    Materialized(Vec<A>),
    /// First touch failed after the server saw the replicas.
    Poisoned(String),
}

/// Observable state of an entry, as reported by
/// [`ParameterStore::status`](crate::ParameterStore::status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaStatus {
    /// The entry exists but holds no replicas.
    Pending,
    /// The entry holds this many replicas.
    Materialized {
        /// Number of replicas.
        replicas: usize,
        /// Flag captured at first touch.
        requires_grad: bool,
    },
    /// A failed first touch left the entry unusable.
    Poisoned {
        /// Error that poisoned the entry.
        reason: String,
    },
}

/// Replica record of one parameter id.
#[derive(Debug)]
pub(crate) struct ReplicaEntry<A> {
    pub(crate) requires_grad: bool,
    pub(crate) state: ReplicaState<A>,
}

impl<A: NdArray> ReplicaEntry<A> {
    fn new(requires_grad: bool) -> Self {
        Self {
            requires_grad,
            state: ReplicaState::Pending,
        }
    }

    /// Returns the replicas, or `None` while pending.
    pub(crate) fn replicas(&self, parameter_id: &str) -> Result<Option<&[A]>> {
        match &self.state {
            ReplicaState::Pending => Ok(None),
            ReplicaState::Materialized(list) => Ok(Some(list)),
            ReplicaState::Poisoned(reason) => Err(Error::PoisonedEntry {
                parameter_id: parameter_id.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    pub(crate) fn status(&self) -> ReplicaStatus {
        match &self.state {
            ReplicaState::Pending => ReplicaStatus::Pending,
            ReplicaState::Materialized(list) => ReplicaStatus::Materialized {
                replicas: list.len(),
                requires_grad: self.requires_grad,
            },
            ReplicaState::Poisoned(reason) => ReplicaStatus::Poisoned {
                reason: reason.clone(),
            },
        }
    }
}

pub(crate) type SharedEntry<A> = Arc<Mutex<ReplicaEntry<A>>>;

// =============================================================================
// ReplicaTable
// =============================================================================

/// Entries in first-touch order with an id index.
#[derive(Debug)]
pub(crate) struct ReplicaTable<A> {
    order: Vec<(String, SharedEntry<A>)>,
    index: HashMap<String, usize>,
}

impl<A: NdArray> ReplicaTable<A> {
    pub(crate) fn new() -> Self {
        Self {
            order: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub(crate) fn get(&self, parameter_id: &str) -> Option<SharedEntry<A>> {
        self.index
            .get(parameter_id)
            .map(|&i| Arc::clone(&self.order[i].1))
    }

    /// Returns the entry for `parameter_id`, creating it with the flag
    /// produced by `requires_grad` if absent. The closure runs only on
    /// creation.
    pub(crate) fn get_or_insert_with(
        &mut self,
        parameter_id: &str,
        requires_grad: impl FnOnce() -> bool,
    ) -> SharedEntry<A> {
        if let Some(entry) = self.get(parameter_id) {
            return entry;
        }
        let entry = Arc::new(Mutex::new(ReplicaEntry::new(requires_grad())));
        self.index.insert(parameter_id.to_string(), self.order.len());
        self.order
            .push((parameter_id.to_string(), Arc::clone(&entry)));
        entry
    }

    /// Entries in first-touch order.
    pub(crate) fn snapshot(&self) -> Vec<(String, SharedEntry<A>)> {
        self.order
            .iter()
            .map(|(id, entry)| (id.clone(), Arc::clone(entry)))
            .collect()
    }

    pub(crate) fn remove(&mut self, parameter_id: &str) -> bool {
        let Some(position) = self.index.remove(parameter_id) else {
            return false;
        };
        self.order.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        true
    }

    pub(crate) fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_ndarray::Tensor;

    #[test]
    fn test_flag_is_captured_once() {
        let mut table: ReplicaTable<Tensor> = ReplicaTable::new();
        let first = table.get_or_insert_with("w", || false);
        let second = table.get_or_insert_with("w", || panic!("flag read twice"));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!first.lock().requires_grad);
    }

    #[test]
    fn test_snapshot_keeps_first_touch_order() {
        let mut table: ReplicaTable<Tensor> = ReplicaTable::new();
        for id in ["c", "a", "b"] {
            table.get_or_insert_with(id, || true);
        }
        let ids: Vec<String> = table.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_remove_reindexes() {
        let mut table: ReplicaTable<Tensor> = ReplicaTable::new();
        for id in ["a", "b", "c"] {
            table.get_or_insert_with(id, || true);
        }
        assert!(table.remove("a"));
        assert!(!table.remove("a"));
        assert_eq!(table.len(), 2);
        assert!(table.get("c").is_some());
        assert!(table.get("a").is_none());

        let ids: Vec<String> = table.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_poisoned_entry_reports_error() {
        let entry: ReplicaEntry<Tensor> = ReplicaEntry {
            requires_grad: true,
            state: ReplicaState::Poisoned("init failed".to_string()),
        };
        assert!(matches!(
            entry.replicas("w"),
            Err(Error::PoisonedEntry { .. })
        ));
        assert_eq!(
            entry.status(),
            ReplicaStatus::Poisoned {
                reason: "init failed".to_string()
            }
        );
    }
}
