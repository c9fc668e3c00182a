//! Free-list arena for list nodes.
//!
//! Backs [`IntrusiveList`](crate::ds::IntrusiveList): nodes are addressed by a
//! stable [`NodeId`] instead of pointers, so the clock rings and ghost lists
//! can link entries by index without cyclic ownership.
//!
//! ## Architecture
//!
//! ```text
//!   nodes: Vec<Option<T>>            free: Vec<usize>
//!   ┌─────┬─────────────┐            ┌───┐
//!   │  0  │ Some(node)  │            │ 1 │ ◄── next insert reuses index 1
//!   │  1  │ None        │            └───┘
//!   │  2  │ Some(node)  │
//!   └─────┴─────────────┘
//! ```
//!
//! Insert pops from `free` before growing, so churn (ghost insert/remove,
//! ring rotation) does not reallocate once the arena reaches its working size.

/// Stable handle to a node stored in a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug)]
pub struct NodeArena<T> {
    nodes: Vec<Option<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> NodeArena<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> NodeId {
        let idx = if let Some(idx) = self.free.pop() {
            self.nodes[idx] = Some(value);
            idx
        } else {
            self.nodes.push(Some(value));
            self.nodes.len() - 1
        };
        self.len += 1;
        NodeId(idx)
    }

    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        let node = self.nodes.get_mut(id.0)?;
        let value = node.take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id.0).and_then(|node| node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(id.0).and_then(|node| node.as_mut())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.0)
            .map(|node| node.is_some())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_arena_insert_remove_reuse() {
        let mut arena = NodeArena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a), Some(&"a"));
        assert_eq!(arena.get(b), Some(&"b"));

        assert_eq!(arena.remove(a), Some("a"));
        assert_eq!(arena.len(), 1);
        assert!(!arena.contains(a));

        let c = arena.insert("c");
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(c), Some(&"c"));
        assert_eq!(a, c);
    }

    #[test]
    fn node_arena_double_remove_is_none() {
        let mut arena = NodeArena::new();
        let id = arena.insert(7);
        assert_eq!(arena.remove(id), Some(7));
        assert_eq!(arena.remove(id), None);
        assert!(arena.is_empty());
    }

    #[test]
    fn node_arena_get_mut_updates_in_place() {
        let mut arena = NodeArena::with_capacity(4);
        let id = arena.insert(1);
        if let Some(v) = arena.get_mut(id) {
            *v = 10;
        }
        assert_eq!(arena.get(id), Some(&10));
    }
}
