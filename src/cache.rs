//! Fixed-capacity cache of frame payloads keyed by slot.
//!
//! Eviction is driven by a per-entry priority rank. Occupied entries
//! always hold a permutation of `{1..=len}`: rank 1 is the most
//! recently touched entry, rank `capacity` is the next victim. Every
//! hit or insert re-ranks in O(len); the cache is small, so a sweep
//! beats maintaining a linked list.

use tracing::trace;

use crate::allocator::Slot;
use crate::config::*;

struct CacheEntry {
    slot: Slot,
    payload: Frame,
    priority: usize,
}

pub struct FrameCache {
    entries: Vec<CacheEntry>,
    capacity: usize,
}

impl FrameCache {
    pub fn new(capacity: usize) -> Self {
        FrameCache {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, slot: Slot) -> Option<usize> {
        self.entries.iter().position(|entry| entry.slot == slot)
    }

    /// Moves the entry at `index` to rank 1. Entries that ranked
    /// strictly better than its previous rank move one step toward
    /// eviction, which keeps the ranks a contiguous permutation.
    fn refresh(&mut self, index: usize) {
        let previous = self.entries[index].priority;
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if i != index && entry.priority < previous {
                entry.priority += 1;
            }
        }
        self.entries[index].priority = 1;
    }

    /// Inserts or refreshes the payload for `slot`. A fresh insert
    /// lands at the worst rank until it is touched again; when the
    /// cache is full the current worst-ranked entry is evicted.
    pub fn put(&mut self, slot: Slot, payload: &Frame) {
        if let Some(index) = self.position(slot) {
            self.entries[index].payload.copy_from_slice(payload);
            self.refresh(index);
        } else if self.entries.len() < self.capacity {
            let priority = self.entries.len() + 1;
            self.entries.push(CacheEntry {
                slot,
                payload: *payload,
                priority,
            });
        } else if let Some(index) = self.entries.iter().position(|e| e.priority == self.capacity) {
            trace!(evicted = ?self.entries[index].slot, inserted = ?slot, "cache eviction");
            let entry = &mut self.entries[index];
            entry.slot = slot;
            entry.payload.copy_from_slice(payload);
            self.refresh(index);
        }
        // Capacity zero: nothing to do, every access faults through.
    }

    /// Returns the cached payload for `slot`, refreshing its rank.
    /// The borrow is valid until the next cache mutation.
    pub fn get(&mut self, slot: Slot) -> Option<&Frame> {
        let index = self.position(slot)?;
        self.refresh(index);
        Some(&self.entries[index].payload)
    }

    /// Removes the entry for `slot` and returns its payload. Worse
    /// ranks shift up one step so the permutation stays contiguous.
    pub fn delete(&mut self, slot: Slot) -> Option<Frame> {
        let index = self.position(slot)?;
        let removed = self.entries.swap_remove(index);
        for entry in &mut self.entries {
            if entry.priority > removed.priority {
                entry.priority -= 1;
            }
        }
        Some(removed.payload)
    }

    /// Current rank of the entry for `slot`: 1 is most recently
    /// touched, `capacity` is next to be evicted.
    pub fn rank(&self, slot: Slot) -> Option<usize> {
        self.position(slot).map(|index| self.entries[index].priority)
    }

    /// True when the occupied ranks form exactly `{1..=len}`. Exposed
    /// so tests can assert the eviction invariant after every step.
    pub fn priorities_consistent(&self) -> bool {
        let mut seen = vec![false; self.entries.len()];
        for entry in &self.entries {
            match entry.priority.checked_sub(1).and_then(|i| seen.get_mut(i)) {
                Some(flag) if !*flag => *flag = true,
                _ => return false,
            }
        }
        true
    }
}
