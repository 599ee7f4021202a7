// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The open-addressing slot table behind the cache.
//!
//! Keys are 32-bit name hashes, hashed once at the API boundary. Collisions are
//! resolved by double hashing: the primary index is `hash % capacity` and probe
//! step `i` visits `(1 + hash + i * (hash % (capacity / 2))) % capacity`.
//! Because that step can be zero or share a factor with the capacity, the
//! double-hash run is followed by a linear sweep, so every probe sequence visits
//! every slot and is bounded by `2 * capacity + 1` positions.
//!
//! Every slot written by an insertion is marked as a tombstone, and the mark is
//! only cleared by a rebuild. A probe that reaches a slot without the mark has
//! proven the key absent, which is what keeps lookups of missing keys finite.

use std::iter;
use thiserror::Error;

/// The typed failure of a lookup for a key that was expected to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    /// No occupied slot holds this hash.
    #[error("No occupied slot holds hash {hash:#010x}")]
    NotFound {
        /// The hash that was looked up.
        hash: u32,
    },
}

/// One element of a [`ProbedTable`], addressed by its index.
#[derive(Debug, Clone)]
pub struct Slot<E> {
    hash: u32,
    occupied: bool,
    tombstone: bool,
    entry: Option<E>,
}

impl<E> Slot<E> {
    fn empty() -> Self {
        Self {
            hash: 0,
            occupied: false,
            tombstone: false,
            entry: None,
        }
    }

    /// The hash last written into this slot. Kept after removal.
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Returns `true` while the slot holds a live entry.
    pub fn is_occupied(&self) -> bool {
        self.occupied
    }

    /// Returns `true` if the slot has been written since the last rebuild.
    pub fn is_tombstone(&self) -> bool {
        self.tombstone
    }

    /// The live entry, if any.
    pub fn entry(&self) -> Option<&E> {
        self.entry.as_ref()
    }
}

/// A fixed-capacity array of slots with double-hash probing and sticky tombstones.
///
/// The table doubles as soon as an insertion brings occupancy to the load
/// factor, and rebuilds in place once too many slots carry a tombstone.
#[derive(Debug, Clone)]
pub struct ProbedTable<E> {
    slots: Vec<Slot<E>>,
    /// Occupied slots.
    count: u32,
    /// Slots carrying a tombstone.
    written: u32,
    load_factor_percent: u32,
    tombstone_rehash_percent: u32,
}

impl<E> ProbedTable<E> {
    /// Creates a table of `capacity` slots that doubles at 70% occupancy.
    pub fn with_capacity(capacity: u32) -> Self {
        Self::with_limits(capacity, 70, 90)
    }

    /// Creates a table with explicit thresholds, both in percent of capacity.
    ///
    /// A `tombstone_rehash_percent` above 100 disables in-place rebuilds.
    pub fn with_limits(
        capacity: u32,
        load_factor_percent: u32,
        tombstone_rehash_percent: u32,
    ) -> Self {
        let capacity = capacity.max(2);
        Self {
            slots: Self::empty_slots(capacity),
            count: 0,
            written: 0,
            load_factor_percent: load_factor_percent.clamp(1, 99),
            tombstone_rehash_percent,
        }
    }

    fn empty_slots(capacity: u32) -> Vec<Slot<E>> {
        iter::repeat_with(Slot::empty)
            .take(capacity as usize)
            .collect()
    }

    /// Total number of slots.
    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Number of occupied slots.
    pub fn len(&self) -> u32 {
        self.count
    }

    /// Returns `true` if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Looks up the slot holding `hash`, if one exists.
    pub fn find_if_exists(&self, hash: u32) -> Option<usize> {
        for index in probe_sequence(hash, self.capacity()) {
            let slot = &self.slots[index];
            if slot.occupied && slot.hash == hash {
                return Some(index);
            }
            if !slot.tombstone {
                return None;
            }
        }
        None
    }

    /// Looks up the slot holding `hash`, reporting its absence as an error.
    ///
    /// Use this on paths where the key is expected to exist.
    pub fn find(&self, hash: u32) -> Result<usize, TableError> {
        self.find_if_exists(hash)
            .ok_or(TableError::NotFound { hash })
    }

    /// Returns `true` if an occupied slot holds `hash`.
    pub fn contains(&self, hash: u32) -> bool {
        self.find_if_exists(hash).is_some()
    }

    /// Returns the index of the slot holding `hash`, inserting `make()` first if
    /// there is none.
    ///
    /// The returned index is valid after any resize the insertion triggered.
    pub fn insert_or_get(&mut self, hash: u32, make: impl FnOnce() -> E) -> usize {
        if let Some(index) = self.find_if_exists(hash) {
            return index;
        }

        let mut index = self.place(hash, make());

        let capacity = self.capacity() as u64;
        if self.count as u64 * 100 / capacity >= self.load_factor_percent as u64 {
            let doubled = self.capacity().saturating_mul(2);
            if let Some(moved) = self.rebuild(doubled, Some(hash)) {
                index = moved;
            }
        } else if self.written as u64 * 100 / capacity >= self.tombstone_rehash_percent as u64 {
            if let Some(moved) = self.rebuild(self.capacity(), Some(hash)) {
                index = moved;
            }
        }

        index
    }

    /// Writes a new entry into the first unoccupied slot of `hash`'s probe
    /// sequence. Does not check thresholds.
    fn place(&mut self, hash: u32, entry: E) -> usize {
        let index = loop {
            if let Some(index) = probe_sequence(hash, self.capacity())
                .find(|&index| !self.slots[index].occupied)
            {
                break index;
            }
            // Only reachable when every slot is occupied.
            let doubled = self.capacity().saturating_mul(2);
            self.rebuild(doubled, None);
        };

        let slot = &mut self.slots[index];
        slot.hash = hash;
        slot.occupied = true;
        slot.entry = Some(entry);
        if !slot.tombstone {
            slot.tombstone = true;
            self.written += 1;
        }
        self.count += 1;
        index
    }

    /// Removes the entry at `index`, returning it.
    ///
    /// The slot keeps its hash and tombstone so it stays a valid probe waypoint.
    pub fn remove(&mut self, index: usize) -> Option<E> {
        let slot = self.slots.get_mut(index)?;
        if !slot.occupied {
            return None;
        }
        slot.occupied = false;
        self.count -= 1;
        slot.entry.take()
    }

    /// Rebuilds the table with `new_capacity` slots.
    ///
    /// Every occupied entry is re-inserted in original slot order; slots that
    /// were only tombstoned are discarded. The capacity never drops to a size
    /// that cannot hold the live entries.
    pub fn resize(&mut self, new_capacity: u32) {
        self.rebuild(new_capacity, None);
    }

    fn rebuild(&mut self, new_capacity: u32, follow: Option<u32>) -> Option<usize> {
        let new_capacity = new_capacity.max(2).max(self.count.saturating_add(1));
        log::debug!(
            "Rebuilding cache table: {} -> {} slots ({} live)",
            self.capacity(),
            new_capacity,
            self.count
        );

        let previous = std::mem::replace(&mut self.slots, Self::empty_slots(new_capacity));
        self.count = 0;
        self.written = 0;

        let mut followed = None;
        for slot in previous {
            if !slot.occupied {
                continue;
            }
            if let Some(entry) = slot.entry {
                let index = self.place(slot.hash, entry);
                if follow == Some(slot.hash) {
                    followed = Some(index);
                }
            }
        }
        followed
    }

    /// Resets every slot to empty without shrinking, returning the live entries.
    pub fn drain(&mut self) -> Vec<(u32, E)> {
        let mut entries = Vec::with_capacity(self.count as usize);
        for slot in &mut self.slots {
            if slot.occupied {
                if let Some(entry) = slot.entry.take() {
                    entries.push((slot.hash, entry));
                }
            }
            *slot = Slot::empty();
        }
        self.count = 0;
        self.written = 0;
        entries
    }

    /// The slot at `index`, occupied or not.
    pub fn slot(&self, index: usize) -> Option<&Slot<E>> {
        self.slots.get(index)
    }

    /// The live entry at `index`.
    pub fn get(&self, index: usize) -> Option<&E> {
        self.slots.get(index).and_then(|slot| slot.entry.as_ref())
    }

    /// The live entry at `index`, mutably.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut E> {
        self.slots
            .get_mut(index)
            .and_then(|slot| slot.entry.as_mut())
    }

    /// The live entry holding `hash`.
    pub fn get_by_hash(&self, hash: u32) -> Option<&E> {
        self.find_if_exists(hash).and_then(|index| self.get(index))
    }

    /// The live entry holding `hash`, mutably.
    pub fn get_mut_by_hash(&mut self, hash: u32) -> Option<&mut E> {
        let index = self.find_if_exists(hash)?;
        self.get_mut(index)
    }

    /// Iterates over occupied slots as `(index, hash, entry)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32, &E)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.occupied)
            .filter_map(|(index, slot)| slot.entry.as_ref().map(|entry| (index, slot.hash, entry)))
    }
}

/// The candidate slots for `hash`: the primary index, `capacity` double-hash
/// steps, then a linear sweep of `capacity` slots.
fn probe_sequence(hash: u32, capacity: u32) -> impl Iterator<Item = usize> {
    let capacity = capacity as u64;
    let hash = hash as u64;
    let step = hash % (capacity / 2);
    let primary = hash % capacity;
    let double = (1..=capacity).map(move |i| ((1 + hash + i * step) % capacity) as usize);
    let last = (1 + hash + capacity * step) % capacity;
    let sweep = (1..=capacity).map(move |k| ((last + k) % capacity) as usize);

    iter::once(primary as usize).chain(double).chain(sweep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_keys_are_found_in_their_own_slot() {
        let mut table = ProbedTable::with_capacity(16);
        let hashes: Vec<u32> = (0..200u32).map(|i| i.wrapping_mul(2_654_435_761)).collect();

        for &hash in &hashes {
            table.insert_or_get(hash, || hash);
        }

        assert_eq!(table.len(), hashes.len() as u32);
        for &hash in &hashes {
            let index = table.find(hash).unwrap();
            let slot = table.slot(index).unwrap();
            assert_eq!(slot.hash(), hash);
            assert_eq!(table.get(index), Some(&hash));
        }
    }

    #[test]
    fn probe_sequence_follows_double_hashing() {
        let sequence: Vec<usize> = probe_sequence(19, 16).take(4).collect();
        // primary 19 % 16, then (1 + 19 + i * (19 % 8)) % 16
        assert_eq!(sequence, vec![3, 7, 10, 13]);
    }

    #[test]
    fn removal_does_not_hide_later_entries() {
        // 3, 19 and 35 share the primary slot and the probe step.
        let mut table = ProbedTable::with_limits(16, 70, 101);
        let first = table.insert_or_get(3, || "a");
        let second = table.insert_or_get(19, || "b");
        let third = table.insert_or_get(35, || "c");
        assert_eq!(first, 3);
        assert_eq!(second, 7);
        assert_eq!(third, 10);

        assert_eq!(table.remove(second), Some("b"));
        assert_eq!(table.find_if_exists(19), None);
        assert_eq!(table.find(19), Err(TableError::NotFound { hash: 19 }));
        assert_eq!(table.find_if_exists(35), Some(third));

        let removed = table.slot(second).unwrap();
        assert!(!removed.is_occupied());
        assert!(removed.is_tombstone());
        assert_eq!(removed.hash(), 19);
    }

    #[test]
    fn removed_slot_is_reused_by_insertion() {
        let mut table = ProbedTable::with_limits(16, 70, 101);
        table.insert_or_get(3, || 1);
        let second = table.insert_or_get(19, || 2);
        table.remove(second);

        let reused = table.insert_or_get(51, || 3);
        assert_eq!(reused, second);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn insert_or_get_returns_existing_slot() {
        let mut table = ProbedTable::with_capacity(16);
        let index = table.insert_or_get(42, || 1);
        let again = table.insert_or_get(42, || panic!("must not build a second entry"));
        assert_eq!(index, again);
        assert_eq!(table.get(index), Some(&1));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn resize_preserves_keys_and_entries() {
        let mut table = ProbedTable::with_capacity(64);
        for hash in 0..30u32 {
            table.insert_or_get(hash * 7919, || format!("entry-{hash}"));
        }
        let removed = table.find(7919).unwrap();
        table.remove(removed);

        table.resize(256);

        assert_eq!(table.capacity(), 256);
        assert_eq!(table.len(), 29);
        assert_eq!(table.find_if_exists(7919), None);
        for hash in (0..30u32).filter(|&h| h != 1) {
            let entry = table.get_by_hash(hash * 7919).unwrap();
            assert_eq!(entry, &format!("entry-{hash}"));
        }
        let tombstones = (0..256)
            .filter_map(|i| table.slot(i))
            .filter(|slot| slot.is_tombstone())
            .count();
        assert_eq!(tombstones, 29, "A rebuild keeps tombstones only for live entries");
    }

    #[test]
    fn resize_fires_eagerly_at_load_factor() {
        let mut table = ProbedTable::with_capacity(10);
        for hash in 0..6u32 {
            table.insert_or_get(hash, || ());
        }
        assert_eq!(table.capacity(), 10);

        table.insert_or_get(6, || ());
        assert_eq!(table.capacity(), 20, "7/10 reaches 70% and must double");

        for hash in 7..500u32 {
            table.insert_or_get(hash * 31, || ());
            assert!(table.len() * 100 / table.capacity() < 70);
        }
    }

    #[test]
    fn zero_probe_step_still_finds_free_slots() {
        // Multiples of capacity / 2 have a probe step of zero.
        let mut table = ProbedTable::with_limits(8, 99, 101);
        let hashes = [0u32, 8, 16, 24, 32, 4, 12];
        for &hash in &hashes {
            table.insert_or_get(hash, || hash);
        }
        assert_eq!(table.capacity(), 8);
        for &hash in &hashes {
            assert_eq!(table.get_by_hash(hash), Some(&hash));
        }
    }

    #[test]
    fn missing_key_lookup_terminates_when_every_slot_is_tombstoned() {
        let mut table = ProbedTable::with_limits(8, 99, 101);
        for hash in 0..7u32 {
            table.insert_or_get(hash, || ());
        }
        table.remove(0);
        table.insert_or_get(7, || ());
        for hash in 1..8u32 {
            let index = table.find(hash).unwrap();
            table.remove(index);
        }
        assert!((0..8).all(|i| table.slot(i).is_some_and(|slot| slot.is_tombstone())));
        assert!(table.is_empty());
        assert_eq!(table.capacity(), 8);

        assert_eq!(table.find_if_exists(1234), None);
        assert!(table.find(99).is_err());
    }

    #[test]
    fn tombstone_pressure_triggers_in_place_rebuild() {
        let mut table = ProbedTable::with_limits(16, 70, 90);
        for round in 0..20u32 {
            let index = table.insert_or_get(round, || round);
            table.remove(index);
        }
        assert_eq!(table.capacity(), 16);
        let tombstones = (0..16)
            .filter_map(|i| table.slot(i))
            .filter(|slot| slot.is_tombstone())
            .count();
        assert!(tombstones * 100 / 16 < 90);
    }

    #[test]
    fn drain_empties_without_shrinking() {
        let mut table = ProbedTable::with_capacity(16);
        for hash in 0..20u32 {
            table.insert_or_get(hash, || hash);
        }
        let capacity = table.capacity();

        let mut drained = table.drain();
        drained.sort_unstable();
        assert_eq!(drained.len(), 20);
        assert_eq!(drained[0], (0, 0));
        assert!(table.is_empty());
        assert_eq!(table.capacity(), capacity);
        assert!(table.slot(0).is_some_and(|slot| !slot.is_tombstone()));
        assert_eq!(table.iter().count(), 0);
    }
}
