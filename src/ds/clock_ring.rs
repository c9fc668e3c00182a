//! Clock ring of resident keys.
//!
//! A resident population in CAR (T1 or T2) is a circular scan order over the
//! keys currently holding a cache slot. The clock hand always points at the
//! head of the ring; "the tail" is the position just behind the hand, i.e.
//! the last entry the hand will reach.
//!
//! ## Architecture
//!
//! ```text
//!   index: FxHashMap<K, SlotId>         order: IntrusiveList<K>
//!   ┌─────────┬─────────┐
//!   │  key A  │ slot 4  │               hand
//!   │  key B  │ slot 0  │                 │
//!   │  key C  │ slot 2  │                 ▼
//!   └─────────┴─────────┘          head ─► [A] ◄──► [B] ◄──► [C] ◄── tail
//!                                           ▲                  │
//!                                           └──── wraps ───────┘
//! ```
//!
//! ## Operations
//!
//! | Operation      | Time | Effect                                         |
//! |----------------|------|------------------------------------------------|
//! | `get`          | O(1) | key -> slot lookup, no mutation                |
//! | `peek_head`    | O(1) | entry under the hand                           |
//! | `remove_head`  | O(1) | unlink entry under the hand, hand moves on     |
//! | `append_tail`  | O(1) | link entry just behind the hand                |
//! | `advance`      | O(1) | hand moves on; old head becomes the tail       |
//!
//! Reference bits are not stored here: they live on the slot so hits can set
//! them without touching ring structure.
//!
//! `debug_validate_invariants()` is available in debug/test builds.
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::intrusive_list::IntrusiveList;
use crate::slot::SlotId;

#[derive(Debug)]
/// Circular scan order over resident keys, each owning one [`SlotId`].
pub struct ClockRing<K> {
    order: IntrusiveList<K>,
    index: FxHashMap<K, SlotId>,
}

impl<K> ClockRing<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty ring.
    pub fn new() -> Self {
        Self {
            order: IntrusiveList::new(),
            index: FxHashMap::default(),
        }
    }

    /// Creates an empty ring with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: IntrusiveList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Returns the number of resident keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns `true` if the ring holds no keys.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns `true` if `key` is resident in this ring.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the slot owned by `key`, if resident.
    pub fn get(&self, key: &K) -> Option<SlotId> {
        self.index.get(key).copied()
    }

    /// Returns the entry under the hand.
    pub fn peek_head(&self) -> Option<(&K, SlotId)> {
        let key = self.order.front()?;
        let slot = self.index.get(key)?;
        Some((key, *slot))
    }

    /// Removes the entry under the hand; the hand moves to the next entry.
    pub fn remove_head(&mut self) -> Option<(K, SlotId)> {
        let key = self.order.pop_front()?;
        let slot = self
            .index
            .remove(&key)
            .expect("clock ring key missing from index");
        Some((key, slot))
    }

    /// Links `key` just behind the hand, making it the last entry scanned.
    ///
    /// # Panics
    ///
    /// Panics if `key` is already resident in this ring.
    pub fn append_tail(&mut self, key: K, slot: SlotId) {
        assert!(
            !self.index.contains_key(&key),
            "clock ring: key appended twice"
        );
        self.order.push_back(key.clone());
        self.index.insert(key, slot);
    }

    /// Moves the hand past the current head without removing it.
    pub fn advance(&mut self) {
        self.order.rotate();
    }

    /// Iterates entries in scan order, starting at the hand.
    pub fn iter(&self) -> impl Iterator<Item = (&K, SlotId)> + '_ {
        self.order
            .iter()
            .filter_map(|key| self.index.get(key).map(|&slot| (key, slot)))
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.order.debug_validate_invariants();
        assert_eq!(self.order.len(), self.index.len());
        let mut seen = std::collections::HashSet::new();
        for key in self.order.iter() {
            assert!(self.index.contains_key(key), "ring key not indexed");
            assert!(seen.insert(key), "ring key linked twice");
        }
    }
}

impl<K> Default for ClockRing<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys<K: Eq + Hash + Clone + Copy>(ring: &ClockRing<K>) -> Vec<K> {
        ring.iter().map(|(k, _)| *k).collect()
    }

    #[test]
    fn clock_ring_empty_has_no_head() {
        let mut ring: ClockRing<u32> = ClockRing::new();
        assert!(ring.is_empty());
        assert_eq!(ring.peek_head(), None);
        assert_eq!(ring.remove_head(), None);
        ring.advance();
        assert!(ring.is_empty());
        ring.debug_validate_invariants();
    }

    #[test]
    fn clock_ring_append_then_scan_order() {
        let mut ring = ClockRing::new();
        ring.append_tail("a", SlotId(0));
        ring.append_tail("b", SlotId(1));
        ring.append_tail("c", SlotId(2));

        assert_eq!(ring.len(), 3);
        assert_eq!(keys(&ring), vec!["a", "b", "c"]);
        assert_eq!(ring.peek_head(), Some((&"a", SlotId(0))));
        assert_eq!(ring.get(&"b"), Some(SlotId(1)));
        assert!(ring.contains(&"c"));
        assert!(!ring.contains(&"d"));
        ring.debug_validate_invariants();
    }

    #[test]
    fn clock_ring_remove_head_moves_hand() {
        let mut ring = ClockRing::new();
        ring.append_tail(1, SlotId(10));
        ring.append_tail(2, SlotId(11));

        assert_eq!(ring.remove_head(), Some((1, SlotId(10))));
        assert_eq!(ring.peek_head(), Some((&2, SlotId(11))));
        assert!(!ring.contains(&1));
        assert_eq!(ring.remove_head(), Some((2, SlotId(11))));
        assert!(ring.is_empty());
        ring.debug_validate_invariants();
    }

    #[test]
    fn clock_ring_advance_retails_head() {
        let mut ring = ClockRing::new();
        ring.append_tail("a", SlotId(0));
        ring.append_tail("b", SlotId(1));
        ring.append_tail("c", SlotId(2));

        ring.advance();
        assert_eq!(keys(&ring), vec!["b", "c", "a"]);
        assert_eq!(ring.peek_head(), Some((&"b", SlotId(1))));

        // Appends land behind the hand, after the re-tailed entry.
        ring.append_tail("d", SlotId(3));
        assert_eq!(keys(&ring), vec!["b", "c", "a", "d"]);
        ring.debug_validate_invariants();
    }

    #[test]
    fn clock_ring_advance_single_entry() {
        let mut ring = ClockRing::new();
        ring.append_tail(5, SlotId(0));
        ring.advance();
        assert_eq!(ring.peek_head(), Some((&5, SlotId(0))));
        ring.debug_validate_invariants();
    }

    #[test]
    fn clock_ring_full_rotation_returns_to_start() {
        let mut ring = ClockRing::with_capacity(4);
        for i in 0..4 {
            ring.append_tail(i, SlotId(i as usize));
        }
        for _ in 0..4 {
            ring.advance();
        }
        assert_eq!(keys(&ring), vec![0, 1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "appended twice")]
    fn clock_ring_duplicate_append_panics() {
        let mut ring = ClockRing::new();
        ring.append_tail("a", SlotId(0));
        ring.append_tail("a", SlotId(1));
    }
}
