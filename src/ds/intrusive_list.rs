//! Doubly linked list whose nodes live in a [`NodeArena`].
//!
//! Nodes are linked by [`NodeId`] rather than by pointer, so a handle stays
//! valid until its node is removed and any node can be unlinked in O(1).
//! Both CAR directory structures sit on top of it: [`ClockRing`] treats it as
//! a circular scan order and turns the hand with [`IntrusiveList::rotate`],
//! [`GhostList`] uses it as an MRU-first key history.
//!
//! [`ClockRing`]: crate::ds::ClockRing
//! [`GhostList`]: crate::ds::GhostList
//!
//! ## Architecture
//!
//! ```text
//!   nodes: NodeArena<Link<T>>
//!   ┌────────┬──────────────────────────────────────────┐
//!   │ NodeId │ Link { value, prev, next }               │
//!   ├────────┼──────────────────────────────────────────┤
//!   │ id_0   │ { A, prev: None,       next: Some(id_2) }│
//!   │ id_2   │ { B, prev: Some(id_0), next: Some(id_1) }│
//!   │ id_1   │ { C, prev: Some(id_2), next: None }      │
//!   └────────┴──────────────────────────────────────────┘
//!
//!   head ─► [id_0] ◄──► [id_2] ◄──► [id_1] ◄── tail
//!
//!   rotate():  head ─► [id_2] ◄──► [id_1] ◄──► [id_0] ◄── tail
//! ```
//!
//! Every structural change funnels through two private primitives,
//! `link_after` and `unlink`; the public operations only pick the
//! neighbours.
//!
//! ## Performance
//! - `push_front` / `push_back` / `pop_front` / `pop_back`: O(1)
//! - `remove(id)` / `rotate`: O(1)
//! - `iter`: O(n)
//!
//! `debug_validate_invariants()` is available in debug/test builds.
use crate::ds::node_arena::{NodeArena, NodeId};

#[derive(Debug)]
struct Link<T> {
    value: T,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

#[derive(Debug)]
/// Linked list over arena-allocated nodes, addressed by [`NodeId`].
pub struct IntrusiveList<T> {
    nodes: NodeArena<Link<T>>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

impl<T> IntrusiveList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: NodeArena::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns `true` if `id` names a node currently linked into this list.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id).map(|link| &link.value)
    }

    pub fn front(&self) -> Option<&T> {
        self.get(self.head?)
    }

    /// Iterates values from front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Links `value` in as the new front node.
    pub fn push_front(&mut self, value: T) -> NodeId {
        let id = self.nodes.insert(Link {
            value,
            prev: None,
            next: None,
        });
        self.link_after(None, id);
        id
    }

    /// Links `value` in as the new back node.
    pub fn push_back(&mut self, value: T) -> NodeId {
        let id = self.nodes.insert(Link {
            value,
            prev: None,
            next: None,
        });
        self.link_after(self.tail, id);
        id
    }

    pub fn pop_front(&mut self) -> Option<T> {
        let id = self.head?;
        self.remove(id)
    }

    pub fn pop_back(&mut self) -> Option<T> {
        let id = self.tail?;
        self.remove(id)
    }

    /// Unlinks node `id` and returns its value; `None` if it is not linked.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        self.unlink(id)?;
        self.nodes.remove(id).map(|link| link.value)
    }

    /// Moves the front node to the back.
    ///
    /// Returns `false` only for an empty list. A single node rotates onto
    /// itself.
    pub fn rotate(&mut self) -> bool {
        let Some(head) = self.head else {
            return false;
        };
        if self.head != self.tail {
            self.unlink(head);
            self.link_after(self.tail, head);
        }
        true
    }

    /// Links the detached node `id` after `prev`, or at the front for `None`.
    fn link_after(&mut self, prev: Option<NodeId>, id: NodeId) {
        let next = match prev {
            Some(prev_id) => self.nodes.get(prev_id).and_then(|link| link.next),
            None => self.head,
        };
        if let Some(link) = self.nodes.get_mut(id) {
            link.prev = prev;
            link.next = next;
        }
        match prev {
            Some(prev_id) => {
                if let Some(link) = self.nodes.get_mut(prev_id) {
                    link.next = Some(id);
                }
            }
            None => self.head = Some(id),
        }
        match next {
            Some(next_id) => {
                if let Some(link) = self.nodes.get_mut(next_id) {
                    link.prev = Some(id);
                }
            }
            None => self.tail = Some(id),
        }
    }

    /// Splices `id` out of the chain, leaving it allocated but detached.
    fn unlink(&mut self, id: NodeId) -> Option<()> {
        let link = self.nodes.get_mut(id)?;
        let prev = link.prev.take();
        let next = link.next.take();
        match prev {
            Some(prev_id) => {
                if let Some(link) = self.nodes.get_mut(prev_id) {
                    link.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next_id) => {
                if let Some(link) = self.nodes.get_mut(next_id) {
                    link.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        Some(())
    }

    /// Walks the chain in both directions and checks it against the arena.
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        assert_eq!(self.head.is_none(), self.tail.is_none());
        assert_eq!(self.head.is_none(), self.is_empty());

        let mut forward = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        let mut expected_prev = None;
        while let Some(id) = cursor {
            assert!(forward.len() < self.len(), "intrusive list: cycle");
            let link = self.nodes.get(id).expect("intrusive list: dangling link");
            assert_eq!(link.prev, expected_prev, "intrusive list: broken prev");
            forward.push(id);
            expected_prev = Some(id);
            cursor = link.next;
        }
        assert_eq!(forward.len(), self.len());
        assert_eq!(forward.last().copied(), self.tail);

        let mut backward = Vec::with_capacity(self.len());
        let mut cursor = self.tail;
        while let Some(id) = cursor {
            assert!(backward.len() < self.len(), "intrusive list: cycle");
            backward.push(id);
            cursor = self.nodes.get(id).and_then(|link| link.prev);
        }
        backward.reverse();
        assert_eq!(forward, backward);
    }
}

impl<T> Default for IntrusiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Front-to-back iterator over an [`IntrusiveList`].
pub struct Iter<'a, T> {
    list: &'a IntrusiveList<T>,
    cursor: Option<NodeId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.list.nodes.get(self.cursor?)?;
        self.cursor = link.next;
        Some(&link.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents<T: Copy>(list: &IntrusiveList<T>) -> Vec<T> {
        list.iter().copied().collect()
    }

    #[test]
    fn pushes_at_both_ends() {
        let mut list = IntrusiveList::new();
        list.push_back('b');
        list.push_front('a');
        list.push_back('c');
        assert_eq!(contents(&list), vec!['a', 'b', 'c']);
        assert_eq!(list.front(), Some(&'a'));
        list.debug_validate_invariants();
    }

    #[test]
    fn pops_drain_to_empty() {
        let mut list = IntrusiveList::with_capacity(3);
        for i in 0..3 {
            list.push_back(i);
        }
        assert_eq!(list.pop_back(), Some(2));
        assert_eq!(list.pop_front(), Some(0));
        assert_eq!(list.pop_front(), Some(1));
        assert_eq!(list.pop_front(), None);
        assert_eq!(list.pop_back(), None);
        assert!(list.is_empty());
        list.debug_validate_invariants();
    }

    #[test]
    fn remove_by_handle_from_the_middle() {
        let mut list = IntrusiveList::new();
        list.push_back("x");
        let y = list.push_back("y");
        list.push_back("z");
        assert_eq!(list.remove(y), Some("y"));
        assert!(!list.contains(y));
        assert_eq!(list.remove(y), None);
        assert_eq!(contents(&list), vec!["x", "z"]);
        list.debug_validate_invariants();
    }

    #[test]
    fn rotate_walks_the_front_round() {
        let mut list = IntrusiveList::new();
        let first = list.push_back(1);
        list.push_back(2);
        list.push_back(3);

        assert!(list.rotate());
        assert_eq!(contents(&list), vec![2, 3, 1]);
        assert_eq!(list.get(first), Some(&1));
        assert!(list.rotate());
        assert!(list.rotate());
        assert_eq!(contents(&list), vec![1, 2, 3]);
        assert_eq!(list.front(), list.get(first));
        list.debug_validate_invariants();
    }

    #[test]
    fn rotate_edge_sizes() {
        let mut list: IntrusiveList<u8> = IntrusiveList::new();
        assert!(!list.rotate());
        list.push_back(9);
        assert!(list.rotate());
        assert_eq!(contents(&list), vec![9]);
        list.debug_validate_invariants();
    }

    #[test]
    fn handles_are_reused_after_removal() {
        let mut list = IntrusiveList::new();
        let a = list.push_back(1);
        list.remove(a);
        let b = list.push_front(2);
        assert_eq!(a, b);
        assert_eq!(list.get(b), Some(&2));
        list.debug_validate_invariants();
    }
}
