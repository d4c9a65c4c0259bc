//! Multi-node write locking in canonical order.
//!
//! Any operation that needs more than one node's payload lock takes them
//! through [`WriteSet`], which always acquires in ascending node id order no
//! matter how the caller lists them. Two operations locking overlapping sets
//! therefore can never wait on each other in a cycle.

use std::sync::Arc;

use parking_lot::RwLockWriteGuard;

use crate::node::{EntryData, Node};

/// Write guards over a set of nodes, addressed by the caller's slot order.
pub(crate) struct WriteSet<'a> {
    guards: Vec<RwLockWriteGuard<'a, EntryData>>,
    /// Caller slot -> index into `guards`. Duplicates share one guard.
    slots: Vec<usize>,
}

impl<'a> WriteSet<'a> {
    /// Lock every node in `nodes`, de-duplicated, in ascending id order.
    pub(crate) fn lock(nodes: &[&'a Arc<Node>]) -> Self {
        let mut order: Vec<usize> = (0..nodes.len()).collect();
        order.sort_by_key(|&slot| nodes[slot].id());

        let mut guards = Vec::with_capacity(nodes.len());
        let mut slots = vec![0; nodes.len()];
        let mut last = None;
        for slot in order {
            let id = nodes[slot].id();
            if last != Some(id) {
                guards.push(nodes[slot].data.write());
                last = Some(id);
            }
            slots[slot] = guards.len() - 1;
        }
        Self { guards, slots }
    }

    pub(crate) fn get(&self, slot: usize) -> &EntryData {
        &self.guards[self.slots[slot]]
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> &mut EntryData {
        &mut self.guards[self.slots[slot]]
    }
}
