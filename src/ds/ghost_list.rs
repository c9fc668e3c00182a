//! Recency-ordered history of evicted keys.
//!
//! CAR keeps two of these (B1 for keys evicted from the recent ring, B2 for
//! keys evicted from the frequent ring). They store keys only, never values,
//! and exist to answer "was this key evicted recently?" so the controller can
//! move its target. Implemented as an `IntrusiveList` plus an index.
//!
//! ## Architecture
//!
//! ```text
//!   index: FxHashMap<K, NodeId>        list: IntrusiveList<K>
//!   ┌─────────┬─────────┐              head ─► [A] ◄──► [B] ◄──► [C] ◄── tail
//!   │  key A  │  id_1   │             newest                        oldest
//!   │  key B  │  id_2   │
//!   └─────────┴─────────┘
//! ```
//!
//! ## Behavior
//! - `insert_head(k)`: records a freshly evicted key as newest
//! - `remove(k)`: drops a key from anywhere (ghost hit)
//! - `remove_tail()`: drops the oldest key (directory trim)
//!
//! The list does not bound itself; the CAR directory rules decide when the
//! tail goes.
//!
//! ## Performance
//! - `insert_head` / `remove` / `remove_tail` / `contains`: O(1) average
//!
//! `debug_validate_invariants()` is available in debug/test builds.
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::ds::intrusive_list::IntrusiveList;
use crate::ds::node_arena::NodeId;

#[derive(Debug)]
/// Key-only history list, newest at the head.
pub struct GhostList<K> {
    list: IntrusiveList<K>,
    index: FxHashMap<K, NodeId>,
}

impl<K> GhostList<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty ghost list.
    pub fn new() -> Self {
        Self {
            list: IntrusiveList::new(),
            index: FxHashMap::default(),
        }
    }

    /// Creates an empty ghost list with room for `capacity` keys.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            list: IntrusiveList::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Returns the number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if there are no keys tracked.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Records `key` as the most recently evicted entry.
    ///
    /// # Panics
    ///
    /// Panics if `key` is already tracked.
    pub fn insert_head(&mut self, key: K) {
        assert!(
            !self.index.contains_key(&key),
            "ghost list: key inserted twice"
        );
        let id = self.list.push_front(key.clone());
        self.index.insert(key, id);
    }

    /// Removes `key` from the ghost list; returns `true` if it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        let id = match self.index.remove(key) {
            Some(id) => id,
            None => return false,
        };
        self.list.remove(id);
        true
    }

    /// Removes and returns the oldest key.
    pub fn remove_tail(&mut self) -> Option<K> {
        let key = self.list.pop_back()?;
        self.index.remove(&key);
        Some(key)
    }

    /// Iterates keys from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &K> + '_ {
        self.list.iter()
    }

    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.list.debug_validate_invariants();
        assert_eq!(self.list.len(), self.index.len());
        for (key, &id) in &self.index {
            assert!(self.list.contains(id));
            assert!(self.list.get(id) == Some(key), "ghost index points at wrong node");
        }
    }
}

impl<K> Default for GhostList<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod property_tests {
    use std::collections::VecDeque;

    use proptest::prelude::*;

    use super::*;

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u16),
        Remove(u16),
        RemoveTail,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u16..48).prop_map(Op::Insert),
            (0u16..48).prop_map(Op::Remove),
            Just(Op::RemoveTail),
        ]
    }

    proptest! {
        /// The ghost list behaves like a newest-first deque with keyed removal.
        #[cfg_attr(miri, ignore)]
        #[test]
        fn prop_matches_deque_model(ops in prop::collection::vec(op_strategy(), 0..200)) {
            let mut ghost = GhostList::new();
            let mut model: VecDeque<u16> = VecDeque::new();

            for op in ops {
                match op {
                    Op::Insert(k) => {
                        if model.contains(&k) {
                            continue;
                        }
                        ghost.insert_head(k);
                        model.push_front(k);
                    }
                    Op::Remove(k) => {
                        let pos = model.iter().position(|&m| m == k);
                        if let Some(pos) = pos {
                            model.remove(pos);
                        }
                        prop_assert_eq!(ghost.remove(&k), pos.is_some());
                    }
                    Op::RemoveTail => {
                        prop_assert_eq!(ghost.remove_tail(), model.pop_back());
                    }
                }
                prop_assert_eq!(ghost.len(), model.len());
                let actual: Vec<u16> = ghost.iter().copied().collect();
                let expected: Vec<u16> = model.iter().copied().collect();
                prop_assert_eq!(actual, expected);
                ghost.debug_validate_invariants();
            }
        }
    }
}
