//! Physical cache slots.
//!
//! A [`Slot`] is one resident position: a reference bit plus the value loaded
//! for whichever key currently owns the position. Slots are numbered by a
//! [`SlotId`] that is handed out once, in order, while the cache fills, and is
//! then recycled only by eviction: the evicted key's id passes to the key that
//! is loaded next. An external fixed-size store can therefore be addressed by
//! `SlotId` instead of by key.
//!
//! The reference bit is an `AtomicBool` so that hits can set it while holding
//! only the shared tier of the cache lock. Structural changes (value swaps,
//! bit clears during replacement) happen under the exclusive tier, so
//! `Relaxed` ordering is sufficient: the lock provides the happens-before edge.
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stable identifier of a physical cache slot.
///
/// Ids are dense: a cache of capacity `c` only ever uses `0..c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub(crate) usize);

impl SlotId {
    /// Returns the slot number as an index into an external store.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SlotId> for usize {
    fn from(id: SlotId) -> Self {
        id.0
    }
}

/// One resident cache position.
#[derive(Debug)]
pub(crate) struct Slot<V> {
    referenced: AtomicBool,
    value: Option<V>,
}

impl<V> Slot<V> {
    pub(crate) fn new() -> Self {
        Self {
            referenced: AtomicBool::new(false),
            value: None,
        }
    }

    #[inline]
    pub(crate) fn is_referenced(&self) -> bool {
        self.referenced.load(Ordering::Relaxed)
    }

    /// Sets the reference bit. Safe to race with other hits.
    #[inline]
    pub(crate) fn mark_referenced(&self) {
        self.referenced.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn clear_referenced(&self) {
        self.referenced.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    /// Moves the value out, leaving the slot empty for its next owner.
    #[inline]
    pub(crate) fn take_value(&mut self) -> Option<V> {
        self.value.take()
    }

    #[inline]
    pub(crate) fn set_value(&mut self, value: Option<V>) {
        self.value = value;
    }
}
