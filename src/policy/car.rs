//! Clock with Adaptive Replacement (CAR) replacement policy.
//!
//! Implements the CAR algorithm, which combines ARC-like adaptivity with Clock
//! mechanics. Hits only set a reference bit (no list moves), so they can be
//! served while other readers hold the same shared lock. Misses run the full
//! replacement algorithm under exclusive access.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                           CarCore<K, V> Layout                              │
//! │                                                                             │
//! │   recent:   ClockRing<K>   (T1)     frequent: ClockRing<K>   (T2)            │
//! │   ┌────────────────────────────┐    ┌────────────────────────────┐          │
//! │   │ hand ─► A ─► B ─► C ─┐     │    │ hand ─► X ─► Y ─┐          │          │
//! │   │   ▲─────────────────┘     │    │   ▲─────────────┘          │          │
//! │   └────────────────────────────┘    └────────────────────────────┘          │
//! │     Ref=0 → evict to ghost_recent     Ref=0 → evict to ghost_frequent       │
//! │     Ref=1 → clear, move to frequent   Ref=1 → clear, advance hand           │
//! │                                                                             │
//! │   ghost_recent: GhostList<K> (B1)    ghost_frequent: GhostList<K> (B2)      │
//! │                                                                             │
//! │   slots: Vec<Slot<V>>   indexed by SlotId, AtomicBool reference bit + value │
//! │   target_recent_size (p), capacity (c), full                                │
//! └─────────────────────────────────────────────────────────────────────────────┘
//!
//! ┌─────────────────────────────────────────────────────────────────────────────┐
//! │                           CarCache<K, V> (façade)                           │
//! │                                                                             │
//! │   load(key)                                                                 │
//! │     │ read tier:   core.get(key) ── hit ──► set ref bit, return value       │
//! │     ▼ miss                                                                  │
//! │   write tier:  core.get(key) ── hit ──► contended hit, return value         │
//! │     │ miss                                                                  │
//! │     ▼                                                                       │
//! │   core.admit(key, loader, notifier)                                         │
//! └─────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Directory invariants
//!
//! With `c` the capacity, after every completed operation:
//!
//! | Tag | Invariant                                        |
//! |-----|--------------------------------------------------|
//! | I1  | `|T1| + |T2| <= c`                               |
//! | I2  | `|T1| + |B1| <= c`                               |
//! | I3  | `|T2| + |B2| <= 2c`                              |
//! | I4  | `|T1| + |T2| + |B1| + |B2| <= 2c`                |
//! | I5  | `|T1| + |T2| < c` implies `|B1| + |B2| = 0`      |
//! | I6  | `|T1| + |T2| + |B1| + |B2| >= c` implies `|T1| + |T2| = c` |
//! | I7  | once full, `|T1| + |T2| = c`                     |
//!
//! and `0 <= p <= c`. A key lives in at most one of the four populations.
//!
//! ## Operations
//!
//! | Operation          | Time   | Notes                                       |
//! |--------------------|--------|---------------------------------------------|
//! | `CarCore::get`     | O(1)   | Sets reference bit only                     |
//! | `CarCore::admit`   | O(c)*  | *Amortized O(1); a sweep may pass every ref bit |
//! | `CarCache::load`   | O(1)*  | Hit under read tier, miss under write tier  |
//! | `check_invariants` | O(c)   | Walks all four populations                  |
//!
//! ## Slot identifiers
//!
//! Slots are numbered `0..c` in the order the cache fills. Once full, no new
//! id is ever minted: the id of each evicted entry is handed to the incoming
//! key, reported to the replacement notifier, and then passed to the loader.
//!
//! ## Example Usage
//!
//! ```
//! use carcache::policy::car::CarCache;
//! use carcache::slot::SlotId;
//!
//! let cache: CarCache<u32, String> = CarCache::builder(2)
//!     .loader(|key: &u32, _slot: SlotId| format!("value-{}", key))
//!     .build();
//!
//! assert_eq!(cache.load(&1).as_deref(), Some("value-1"));
//! assert_eq!(cache.load(&1).as_deref(), Some("value-1")); // hit, no reload
//! assert_eq!(cache.len(), 1);
//! assert!(cache.check_invariants().is_ok());
//! ```
//!
//! ## Thread Safety
//!
//! - [`CarCore`]: `Send + Sync`, but mutation needs `&mut self`; wrap it in a
//!   lock for shared use.
//! - [`CarCache`]: cheap to clone, all clones share one directory behind a
//!   `parking_lot::RwLock`.
//!
//! ## References
//!
//! - Bansal & Modha, "CAR: Clock with Adaptive Replacement", FAST 2004

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
#[cfg(feature = "metrics")]
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::ds::{ClockRing, GhostList};
use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::CarMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::CarMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{
    CarMetricsRecorder, CoreMetricsReadRecorder, CoreMetricsRecorder, MetricsReset,
    MetricsSnapshotProvider,
};
use crate::slot::{Slot, SlotId};
use crate::traits::{ConcurrentCache, ReadOnlyCache, ReplacementNotifier, ValueLoader};

/// Which resident ring an entry is evicted from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Ring {
    Recent,
    Frequent,
}

/// An entry pushed out by the clock sweep, reported once its slot has a new
/// owner.
struct Eviction<K, V> {
    key: K,
    value: Option<V>,
    slot: SlotId,
}

/// Which of the four CAR populations holds a key.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Residency {
    /// Resident, seen once since admission (T1).
    Recent,
    /// Resident, referenced again after admission (T2).
    Frequent,
    /// Recently evicted from the recent ring (B1).
    GhostRecent,
    /// Recently evicted from the frequent ring (B2).
    GhostFrequent,
}

impl Residency {
    /// Returns `true` for the two resident populations.
    pub fn is_resident(self) -> bool {
        matches!(self, Residency::Recent | Residency::Frequent)
    }
}

// ---------------------------------------------------------------------------
// CarCore
// ---------------------------------------------------------------------------

/// Single-threaded CAR engine.
///
/// Owns the directory (two clock rings, two ghost lists, the adaptive target)
/// and the slot array. Values are opaque; the engine never inspects them.
///
/// [`get`](Self::get) is the hit path and takes `&self`. [`admit`](Self::admit)
/// is the miss algorithm and takes `&mut self`. Callers decide between them;
/// [`CarCache`] does so under a two-tier lock.
///
/// # Example
///
/// ```
/// use carcache::policy::car::{CarCore, Residency};
///
/// let mut core: CarCore<&str, u32> = CarCore::new(2);
/// assert!(core.get(&"a").is_none());
///
/// let value = core.admit("a", |_key, slot| Some(slot.index() as u32), |_, _, _| {});
/// assert_eq!(value, Some(&0));
/// assert_eq!(core.get(&"a"), Some(Some(&0)));
/// assert_eq!(core.residency(&"a"), Some(Residency::Recent));
/// ```
pub struct CarCore<K, V> {
    recent: ClockRing<K>,
    frequent: ClockRing<K>,
    ghost_recent: GhostList<K>,
    ghost_frequent: GhostList<K>,
    slots: Vec<Slot<V>>,
    target_recent_size: usize,
    capacity: usize,
    full: bool,
    #[cfg(feature = "metrics")]
    metrics: CarMetrics,
}

impl<K, V> CarCore<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty engine with room for `capacity` resident entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. Use [`try_new`](Self::try_new) for a
    /// non-panicking alternative.
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Ok(core) => core,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates an empty engine, rejecting a zero capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `capacity` is zero.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::new("cache capacity must be greater than zero"));
        }
        Ok(Self {
            recent: ClockRing::with_capacity(capacity),
            frequent: ClockRing::with_capacity(capacity),
            ghost_recent: GhostList::with_capacity(capacity),
            ghost_frequent: GhostList::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            target_recent_size: 0,
            capacity,
            full: false,
            #[cfg(feature = "metrics")]
            metrics: CarMetrics::default(),
        })
    }

    /// Hit path: sets the reference bit of a resident key and returns its value.
    ///
    /// The outer `Option` is the hit/miss signal. The inner one is `None` when
    /// the key was admitted without a value (no loader configured).
    ///
    /// Only the slot's atomic reference bit changes, so this may run
    /// concurrently with other `get` calls on the same engine.
    #[inline]
    pub fn get(&self, key: &K) -> Option<Option<&V>> {
        let slot = self.slot_of(key)?;
        let entry = &self.slots[slot.index()];
        entry.mark_referenced();
        #[cfg(feature = "metrics")]
        (&self.metrics).record_hit();
        Some(entry.value())
    }

    /// Miss path: admits a key that is not resident.
    ///
    /// Runs one step of CAR: if the cache is full, evicts one entry and trims
    /// the ghost directory for brand-new keys; moves the adaptive target on a
    /// ghost hit; places the key; invokes `notify` with the evicted key, its
    /// value and the vacated slot; then calls `load` with the key and its slot
    /// and stores the result.
    ///
    /// The directory is complete before either callback runs, so a panic in
    /// `notify` or `load` leaves every invariant intact with an empty value in
    /// the key's slot. The vacated slot is still reported before its new
    /// owner is loaded into it.
    ///
    /// # Panics
    ///
    /// Panics if `key` is already resident.
    pub fn admit<L, N>(&mut self, key: K, load: L, mut notify: N) -> Option<&V>
    where
        L: FnOnce(&K, SlotId) -> Option<V>,
        N: FnMut(&K, Option<V>, SlotId),
    {
        assert!(
            !self.recent.contains(&key) && !self.frequent.contains(&key),
            "car: admit called for a resident key"
        );

        let in_ghost_recent = self.ghost_recent.contains(&key);
        let in_ghost_frequent = self.ghost_frequent.contains(&key);

        #[cfg(feature = "metrics")]
        self.metrics.record_miss();

        trace!(
            resident = self.len(),
            capacity = self.capacity,
            target = self.target_recent_size,
            in_ghost_recent,
            in_ghost_frequent,
            "car miss"
        );

        let evicted = if self.len() == self.capacity {
            self.full = true;
            let evicted = self.replace();
            if !in_ghost_recent && !in_ghost_frequent {
                self.trim_directory();
            }
            Some(evicted)
        } else {
            None
        };

        let slot = match &evicted {
            Some(evicted) => evicted.slot,
            None => self.allocate_slot(),
        };

        if in_ghost_recent {
            #[cfg(feature = "metrics")]
            self.metrics.record_ghost_recent_hit();
            let delta = (self.ghost_frequent.len() / self.ghost_recent.len()).max(1);
            self.set_target((self.target_recent_size + delta).min(self.capacity));
            assert!(
                self.ghost_recent.remove(&key),
                "ghost_recent lost a key it reported"
            );
            self.frequent.append_tail(key.clone(), slot);
        } else if in_ghost_frequent {
            #[cfg(feature = "metrics")]
            self.metrics.record_ghost_frequent_hit();
            let delta = (self.ghost_recent.len() / self.ghost_frequent.len()).max(1);
            self.set_target(self.target_recent_size.saturating_sub(delta));
            assert!(
                self.ghost_frequent.remove(&key),
                "ghost_frequent lost a key it reported"
            );
            self.frequent.append_tail(key.clone(), slot);
        } else {
            self.recent.append_tail(key.clone(), slot);
        }

        if let Some(evicted) = evicted {
            notify(&evicted.key, evicted.value, evicted.slot);
        }

        let value = load(&key, slot);
        #[cfg(feature = "metrics")]
        {
            if value.is_some() {
                self.metrics.record_load();
            }
        }

        let entry = &mut self.slots[slot.index()];
        entry.set_value(value);
        entry.value()
    }

    /// Returns `true` if `key` is resident but its slot holds no value.
    pub(crate) fn holds_empty_slot(&self, key: &K) -> bool {
        self.slot_of(key)
            .is_some_and(|slot| self.slots[slot.index()].value().is_none())
    }

    /// Re-runs `load` for a resident key whose slot holds no value.
    ///
    /// A slot is left empty when the loader panicked (or no loader was set)
    /// during `admit`. Returns `None` if `key` is not resident. A slot that
    /// already holds a value is returned untouched and `load` is not called.
    /// Placement and reference bits do not change.
    pub fn refill<L>(&mut self, key: &K, load: L) -> Option<Option<&V>>
    where
        L: FnOnce(&K, SlotId) -> Option<V>,
    {
        let slot = self.slot_of(key)?;
        if self.slots[slot.index()].value().is_none() {
            let value = load(key, slot);
            #[cfg(feature = "metrics")]
            {
                if value.is_some() {
                    self.metrics.record_load();
                }
            }
            debug!(slot = slot.index(), "car refilled empty slot");
            self.slots[slot.index()].set_value(value);
        }
        Some(self.slots[slot.index()].value())
    }

    /// Frees one slot by sweeping a clock hand. The vacated slot's reference
    /// bit is clear.
    fn replace(&mut self) -> Eviction<K, V> {
        if self.recent.len() >= self.target_recent_size.max(1) {
            while let Some((key, slot)) = self.recent.remove_head() {
                let entry = &self.slots[slot.index()];
                if entry.is_referenced() {
                    entry.clear_referenced();
                    self.frequent.append_tail(key, slot);
                    #[cfg(feature = "metrics")]
                    {
                        self.metrics.record_hand_sweep();
                        self.metrics.record_recent_to_frequent_promotion();
                    }
                } else {
                    return self.evict(key, slot, Ring::Recent);
                }
            }
            // Every recent entry was referenced and moved over.
            debug!("car recent ring drained during replacement; sweeping frequent ring");
        }

        loop {
            let (_, slot) = self
                .frequent
                .peek_head()
                .expect("frequent ring empty during replacement");
            let entry = &self.slots[slot.index()];
            if entry.is_referenced() {
                entry.clear_referenced();
                self.frequent.advance();
                #[cfg(feature = "metrics")]
                self.metrics.record_hand_sweep();
            } else {
                let (key, slot) = self
                    .frequent
                    .remove_head()
                    .expect("frequent ring empty during replacement");
                return self.evict(key, slot, Ring::Frequent);
            }
        }
    }

    fn evict(&mut self, key: K, slot: SlotId, from: Ring) -> Eviction<K, V> {
        let value = self.slots[slot.index()].take_value();
        match from {
            Ring::Recent => self.ghost_recent.insert_head(key.clone()),
            Ring::Frequent => self.ghost_frequent.insert_head(key.clone()),
        }
        #[cfg(feature = "metrics")]
        self.metrics.record_evicted_entry();
        debug!(slot = slot.index(), ring = ?from, "car replaced entry");
        Eviction { key, value, slot }
    }

    /// Bounds the directory to `2c` keys before a brand-new key is placed.
    fn trim_directory(&mut self) {
        if self.recent.len() + self.ghost_recent.len() == self.capacity {
            self.ghost_recent
                .remove_tail()
                .expect("ghost_recent empty during directory trim");
            #[cfg(feature = "metrics")]
            self.metrics.record_ghost_recent_trim();
            debug!(ghost_recent = self.ghost_recent.len(), "car trimmed ghost_recent");
        } else if self.directory_len() == 2 * self.capacity {
            self.ghost_frequent
                .remove_tail()
                .expect("ghost_frequent empty during directory trim");
            #[cfg(feature = "metrics")]
            self.metrics.record_ghost_frequent_trim();
            debug!(
                ghost_frequent = self.ghost_frequent.len(),
                "car trimmed ghost_frequent"
            );
        }
    }

    fn allocate_slot(&mut self) -> SlotId {
        let slot = SlotId(self.slots.len());
        self.slots.push(Slot::new());
        #[cfg(feature = "metrics")]
        self.metrics.record_slot_allocated();
        slot
    }

    fn set_target(&mut self, target: usize) {
        if target == self.target_recent_size {
            return;
        }
        #[cfg(feature = "metrics")]
        {
            if target > self.target_recent_size {
                self.metrics.record_target_increase();
            } else {
                self.metrics.record_target_decrease();
            }
        }
        debug!(
            from = self.target_recent_size,
            to = target,
            "car target recent size changed"
        );
        self.target_recent_size = target;
    }

    fn directory_len(&self) -> usize {
        self.recent.len() + self.frequent.len() + self.ghost_recent.len() + self.ghost_frequent.len()
    }

    // =========================================================================
    // Public accessors
    // =========================================================================

    /// Returns the fixed capacity `c`.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of resident entries (`|T1| + |T2|`).
    #[inline]
    pub fn len(&self) -> usize {
        self.recent.len() + self.frequent.len()
    }

    /// Returns `true` if nothing is resident.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once the resident rings have reached capacity.
    ///
    /// Never resets.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Returns the adaptive target size `p` for the recent ring.
    ///
    /// Higher values favor recency, lower values favor frequency.
    #[inline]
    pub fn target_recent_size(&self) -> usize {
        self.target_recent_size
    }

    /// Returns `|T1|`.
    #[inline]
    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    /// Returns `|T2|`.
    #[inline]
    pub fn frequent_len(&self) -> usize {
        self.frequent.len()
    }

    /// Returns `|B1|`.
    #[inline]
    pub fn ghost_recent_len(&self) -> usize {
        self.ghost_recent.len()
    }

    /// Returns `|B2|`.
    #[inline]
    pub fn ghost_frequent_len(&self) -> usize {
        self.ghost_frequent.len()
    }

    /// Returns how many slot ids have been minted. Never exceeds `capacity`.
    #[inline]
    pub fn slots_allocated(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if `key` is resident. Does not set the reference bit.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.recent.contains(key) || self.frequent.contains(key)
    }

    /// Returns the slot owned by a resident key. Does not set the reference bit.
    pub fn slot_of(&self, key: &K) -> Option<SlotId> {
        self.recent.get(key).or_else(|| self.frequent.get(key))
    }

    /// Reports which population holds `key`, if any.
    pub fn residency(&self, key: &K) -> Option<Residency> {
        if self.recent.contains(key) {
            Some(Residency::Recent)
        } else if self.frequent.contains(key) {
            Some(Residency::Frequent)
        } else if self.ghost_recent.contains(key) {
            Some(Residency::GhostRecent)
        } else if self.ghost_frequent.contains(key) {
            Some(Residency::GhostFrequent)
        } else {
            None
        }
    }

    /// Verifies every directory invariant.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantError`] naming the first violated property.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let c = self.capacity;
        let t1 = self.recent.len();
        let t2 = self.frequent.len();
        let b1 = self.ghost_recent.len();
        let b2 = self.ghost_frequent.len();
        let resident = t1 + t2;
        let directory = resident + b1 + b2;

        if resident > c {
            return Err(InvariantError::new(format!(
                "I1: |T1|+|T2| = {} exceeds capacity {}",
                resident, c
            )));
        }
        if t1 + b1 > c {
            return Err(InvariantError::new(format!(
                "I2: |T1|+|B1| = {} exceeds capacity {}",
                t1 + b1,
                c
            )));
        }
        if t2 + b2 > 2 * c {
            return Err(InvariantError::new(format!(
                "I3: |T2|+|B2| = {} exceeds 2c = {}",
                t2 + b2,
                2 * c
            )));
        }
        if directory > 2 * c {
            return Err(InvariantError::new(format!(
                "I4: directory size {} exceeds 2c = {}",
                directory,
                2 * c
            )));
        }
        if resident < c && b1 + b2 != 0 {
            return Err(InvariantError::new(format!(
                "I5: {} ghost keys while only {} of {} slots are resident",
                b1 + b2,
                resident,
                c
            )));
        }
        if directory >= c && resident != c {
            return Err(InvariantError::new(format!(
                "I6: directory size {} >= c but only {} resident",
                directory, resident
            )));
        }
        if self.full && resident != c {
            return Err(InvariantError::new(format!(
                "I7: cache is full but only {} of {} slots are resident",
                resident, c
            )));
        }
        if self.target_recent_size > c {
            return Err(InvariantError::new(format!(
                "target recent size {} exceeds capacity {}",
                self.target_recent_size, c
            )));
        }
        if self.slots.len() > c {
            return Err(InvariantError::new(format!(
                "{} slots allocated for capacity {}",
                self.slots.len(),
                c
            )));
        }
        if self.slots.len() != resident {
            return Err(InvariantError::new(format!(
                "{} slots allocated but {} keys resident",
                self.slots.len(),
                resident
            )));
        }

        let mut slot_owned = vec![false; self.slots.len()];
        for (ring_name, ring) in [("recent", &self.recent), ("frequent", &self.frequent)] {
            let mut walked = 0;
            for (key, slot) in ring.iter() {
                walked += 1;
                let Some(owned) = slot_owned.get_mut(slot.index()) else {
                    return Err(InvariantError::new(format!(
                        "{} ring holds slot {} beyond {} allocated",
                        ring_name,
                        slot,
                        self.slots.len()
                    )));
                };
                if *owned {
                    return Err(InvariantError::new(format!(
                        "slot {} owned by two resident keys",
                        slot
                    )));
                }
                *owned = true;
                let elsewhere = match ring_name {
                    "recent" => self.frequent.contains(key),
                    _ => self.recent.contains(key),
                } || self.ghost_recent.contains(key)
                    || self.ghost_frequent.contains(key);
                if elsewhere {
                    return Err(InvariantError::new(format!(
                        "key in {} ring is tracked by another population",
                        ring_name
                    )));
                }
            }
            if walked != ring.len() {
                return Err(InvariantError::new(format!(
                    "{} ring walk found {} entries, index has {}",
                    ring_name,
                    walked,
                    ring.len()
                )));
            }
        }

        for key in self.ghost_recent.iter() {
            if self.ghost_frequent.contains(key) {
                return Err(InvariantError::new("key present in both ghost populations"));
            }
        }
        if self.ghost_recent.iter().count() != b1 || self.ghost_frequent.iter().count() != b2 {
            return Err(InvariantError::new("ghost list walk disagrees with its index"));
        }

        Ok(())
    }

    /// Resets all counters to zero.
    #[cfg(feature = "metrics")]
    pub fn reset_metrics(&mut self) {
        self.metrics = CarMetrics::default();
    }

    /// Validates ring/list internals and the directory invariants; panics on
    /// the first violation. Available in debug/test builds.
    #[cfg(any(test, debug_assertions))]
    pub fn debug_validate_invariants(&self) {
        self.recent.debug_validate_invariants();
        self.frequent.debug_validate_invariants();
        self.ghost_recent.debug_validate_invariants();
        self.ghost_frequent.debug_validate_invariants();
        if let Err(e) = self.check_invariants() {
            panic!("{}", e);
        }
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider<CarMetricsSnapshot> for CarCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn snapshot(&self) -> CarMetricsSnapshot {
        CarMetricsSnapshot {
            cache_len: self.len(),
            capacity: self.capacity,
            target_recent_size: self.target_recent_size,
            recent_len: self.recent.len(),
            frequent_len: self.frequent.len(),
            ghost_recent_len: self.ghost_recent.len(),
            ghost_frequent_len: self.ghost_frequent.len(),
            ..CarMetricsSnapshot::from_counters(&self.metrics)
        }
    }
}

impl<K, V> fmt::Debug for CarCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarCore")
            .field("capacity", &self.capacity)
            .field("recent_len", &self.recent.len())
            .field("frequent_len", &self.frequent.len())
            .field("ghost_recent_len", &self.ghost_recent.len())
            .field("ghost_frequent_len", &self.ghost_frequent.len())
            .field("target_recent_size", &self.target_recent_size)
            .field("full", &self.full)
            .finish()
    }
}

impl<K, V> ReadOnlyCache<K, V> for CarCore<K, V>
where
    K: Eq + Hash + Clone,
{
    fn contains(&self, key: &K) -> bool {
        CarCore::contains(self, key)
    }

    fn len(&self) -> usize {
        CarCore::len(self)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// CarCache
// ---------------------------------------------------------------------------

type BoxedLoader<K, V> = Box<dyn ValueLoader<K, V>>;
type BoxedNotifier<K, V> = Box<dyn ReplacementNotifier<K, V>>;

struct CarState<K, V> {
    core: CarCore<K, V>,
    loader: Option<BoxedLoader<K, V>>,
    notifier: Option<BoxedNotifier<K, V>>,
}

struct CarShared<K, V> {
    state: RwLock<CarState<K, V>>,
    /// Misses on the read tier that found the key after taking the write tier.
    #[cfg(feature = "metrics")]
    contended_hits: AtomicU64,
}

/// Thread-safe CAR cache.
///
/// The single externally callable operation is [`load`](Self::load) (or
/// [`load_with`](Self::load_with) for values that are not `Clone`). A hit is
/// served under the shared tier of a `parking_lot::RwLock`; a miss takes the
/// exclusive tier, re-checks for a hit that raced ahead, and otherwise runs
/// [`CarCore::admit`] with the configured callbacks.
///
/// Clones share the same directory and callbacks.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use carcache::policy::car::CarCache;
/// use carcache::slot::SlotId;
///
/// let loads = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&loads);
/// let cache: CarCache<u64, u64> = CarCache::builder(16)
///     .loader(move |key: &u64, _slot: SlotId| {
///         counter.fetch_add(1, Ordering::Relaxed);
///         key * 10
///     })
///     .build();
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let cache = cache.clone();
///         std::thread::spawn(move || cache.load(&7))
///     })
///     .collect();
/// for handle in handles {
///     assert_eq!(handle.join().unwrap(), Some(70));
/// }
/// assert_eq!(loads.load(Ordering::Relaxed), 1);
/// ```
pub struct CarCache<K, V> {
    inner: Arc<CarShared<K, V>>,
}

impl<K, V> Clone for CarCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> CarCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a cache with no callbacks configured.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. For a non-panicking alternative, use
    /// [`try_new`](Self::try_new) or the [`builder`](Self::builder) with
    /// [`try_build`](CarCacheBuilder::try_build).
    pub fn new(capacity: usize) -> Self {
        match Self::try_new(capacity) {
            Ok(cache) => cache,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a cache, returning an error on a zero capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `capacity` is zero.
    pub fn try_new(capacity: usize) -> Result<Self, ConfigError> {
        Ok(Self::from_parts(CarCore::try_new(capacity)?, None, None))
    }

    /// Returns a builder for configuring callbacks at construction.
    pub fn builder(capacity: usize) -> CarCacheBuilder<K, V> {
        CarCacheBuilder::new(capacity)
    }

    fn from_parts(
        core: CarCore<K, V>,
        loader: Option<BoxedLoader<K, V>>,
        notifier: Option<BoxedNotifier<K, V>>,
    ) -> Self {
        Self {
            inner: Arc::new(CarShared {
                state: RwLock::new(CarState {
                    core,
                    loader,
                    notifier,
                }),
                #[cfg(feature = "metrics")]
                contended_hits: AtomicU64::new(0),
            }),
        }
    }

    /// Installs the callback that produces values on a miss.
    ///
    /// Takes the exclusive tier; affects every clone.
    pub fn set_loader<L>(&self, loader: L)
    where
        L: ValueLoader<K, V> + 'static,
    {
        self.inner.state.write().loader = Some(Box::new(loader));
    }

    /// Installs the callback invoked for every eviction.
    ///
    /// Takes the exclusive tier; affects every clone.
    pub fn set_replacement_notifier<N>(&self, notifier: N)
    where
        N: ReplacementNotifier<K, V> + 'static,
    {
        self.inner.state.write().notifier = Some(Box::new(notifier));
    }

    /// Returns a clone of the value for `key`, loading it on a miss.
    ///
    /// `None` means the key holds no value, which only happens when no
    /// loader is configured. A key whose earlier load panicked is loaded
    /// again here.
    pub fn load(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.load_with(key, |value| value.cloned())
    }

    /// Applies `f` to the value for `key`, loading it on a miss.
    ///
    /// `f` runs while the cache lock is held (shared tier on a hit, exclusive
    /// tier on a miss); keep it short and never call back into the cache.
    ///
    /// # Example
    ///
    /// ```
    /// use carcache::policy::car::CarCache;
    /// use carcache::slot::SlotId;
    ///
    /// let cache: CarCache<u8, Vec<u8>> = CarCache::builder(4)
    ///     .loader(|key: &u8, _slot: SlotId| vec![*key; 3])
    ///     .build();
    /// assert_eq!(cache.load_with(&9, |v| v.map(Vec::len)), Some(3));
    /// ```
    pub fn load_with<F, R>(&self, key: &K, f: F) -> R
    where
        F: FnOnce(Option<&V>) -> R,
    {
        {
            let guard = self.inner.state.read();
            if let Some(value) = guard.core.get(key) {
                // An empty slot with a loader installed is reloaded below.
                if value.is_some() || guard.loader.is_none() {
                    return f(value);
                }
            }
        }

        let mut guard = self.inner.state.write();
        let CarState {
            core,
            loader,
            notifier,
        } = &mut *guard;

        if let Some(loader) = loader.as_ref() {
            if core.holds_empty_slot(key) {
                if let Some(value) = core.refill(key, |key, slot| Some(loader.load(key, slot))) {
                    return f(value);
                }
            }
        }

        if let Some(value) = core.get(key) {
            #[cfg(feature = "metrics")]
            self.inner.contended_hits.fetch_add(1, Ordering::Relaxed);
            debug!("car contended miss resolved to a hit");
            return f(value);
        }

        let value = core.admit(
            key.clone(),
            |key, slot| loader.as_ref().map(|loader| loader.load(key, slot)),
            |key, value, slot| {
                if let Some(notifier) = notifier.as_ref() {
                    notifier.replaced(key, value, slot);
                }
            },
        );
        f(value)
    }

    /// Returns `true` if `key` is resident. Does not set the reference bit.
    pub fn contains(&self, key: &K) -> bool {
        self.inner.state.read().core.contains(key)
    }

    /// Returns the number of resident entries.
    pub fn len(&self) -> usize {
        self.inner.state.read().core.len()
    }

    /// Returns `true` if nothing is resident.
    pub fn is_empty(&self) -> bool {
        self.inner.state.read().core.is_empty()
    }

    /// Returns the fixed capacity.
    pub fn capacity(&self) -> usize {
        self.inner.state.read().core.capacity()
    }

    /// Returns `true` once the cache has filled.
    pub fn is_full(&self) -> bool {
        self.inner.state.read().core.is_full()
    }

    /// Returns the adaptive target size `p`.
    pub fn target_recent_size(&self) -> usize {
        self.inner.state.read().core.target_recent_size()
    }

    /// Returns `|T1|`.
    pub fn recent_len(&self) -> usize {
        self.inner.state.read().core.recent_len()
    }

    /// Returns `|T2|`.
    pub fn frequent_len(&self) -> usize {
        self.inner.state.read().core.frequent_len()
    }

    /// Returns `|B1|`.
    pub fn ghost_recent_len(&self) -> usize {
        self.inner.state.read().core.ghost_recent_len()
    }

    /// Returns `|B2|`.
    pub fn ghost_frequent_len(&self) -> usize {
        self.inner.state.read().core.ghost_frequent_len()
    }

    /// Returns how many slot ids have been minted.
    pub fn slots_allocated(&self) -> usize {
        self.inner.state.read().core.slots_allocated()
    }

    /// Returns the slot owned by a resident key.
    pub fn slot_of(&self, key: &K) -> Option<SlotId> {
        self.inner.state.read().core.slot_of(key)
    }

    /// Reports which population holds `key`, if any.
    pub fn residency(&self, key: &K) -> Option<Residency> {
        self.inner.state.read().core.residency(key)
    }

    /// Verifies every directory invariant under the shared tier.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.state.read().core.check_invariants()
    }

    /// Returns merged counters (engine plus contended hits) and gauges.
    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> CarMetricsSnapshot {
        let mut snapshot = self.inner.state.read().core.snapshot();
        snapshot.contended_hits = self.inner.contended_hits.load(Ordering::Relaxed);
        snapshot
    }

    /// Resets all counters to zero.
    #[cfg(feature = "metrics")]
    pub fn reset_metrics(&self) {
        self.inner.state.write().core.reset_metrics();
        self.inner.contended_hits.store(0, Ordering::Relaxed);
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider<CarMetricsSnapshot> for CarCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn snapshot(&self) -> CarMetricsSnapshot {
        self.metrics()
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsReset for CarCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn reset_metrics(&self) {
        CarCache::reset_metrics(self);
    }
}

impl<K, V> fmt::Debug for CarCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("CarCache")
            .field("core", &state.core)
            .field("has_loader", &state.loader.is_some())
            .field("has_notifier", &state.notifier.is_some())
            .finish()
    }
}

impl<K, V> ReadOnlyCache<K, V> for CarCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn contains(&self, key: &K) -> bool {
        CarCache::contains(self, key)
    }

    fn len(&self) -> usize {
        CarCache::len(self)
    }

    fn capacity(&self) -> usize {
        CarCache::capacity(self)
    }
}

impl<K, V> ConcurrentCache for CarCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
}

// ---------------------------------------------------------------------------
// CarCacheBuilder
// ---------------------------------------------------------------------------

/// Builder for [`CarCache`].
///
/// # Example
///
/// ```
/// use carcache::policy::car::CarCache;
/// use carcache::slot::SlotId;
///
/// let cache = CarCache::<String, usize>::builder(8)
///     .loader(|key: &String, _slot: SlotId| key.len())
///     .replacement_notifier(|_key: &String, _value: Option<usize>, _slot: SlotId| {})
///     .try_build()
///     .unwrap();
/// assert_eq!(cache.load(&"four".to_string()), Some(4));
/// ```
pub struct CarCacheBuilder<K, V> {
    capacity: usize,
    loader: Option<BoxedLoader<K, V>>,
    notifier: Option<BoxedNotifier<K, V>>,
}

impl<K, V> CarCacheBuilder<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Starts a builder for a cache of `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            loader: None,
            notifier: None,
        }
    }

    /// Sets the callback that produces values on a miss.
    pub fn loader<L>(mut self, loader: L) -> Self
    where
        L: ValueLoader<K, V> + 'static,
    {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Sets the callback invoked for every eviction.
    pub fn replacement_notifier<N>(mut self, notifier: N) -> Self
    where
        N: ReplacementNotifier<K, V> + 'static,
    {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Builds the cache.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is zero. Use [`try_build`](Self::try_build)
    /// for a non-panicking alternative.
    pub fn build(self) -> CarCache<K, V> {
        match self.try_build() {
            Ok(cache) => cache,
            Err(e) => panic!("{}", e),
        }
    }

    /// Builds the cache, returning an error on invalid configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the capacity is zero.
    pub fn try_build(self) -> Result<CarCache<K, V>, ConfigError> {
        let core = CarCore::try_new(self.capacity)?;
        Ok(CarCache::from_parts(core, self.loader, self.notifier))
    }
}

impl<K, V> fmt::Debug for CarCacheBuilder<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarCacheBuilder")
            .field("capacity", &self.capacity)
            .field("has_loader", &self.loader.is_some())
            .field("has_notifier", &self.notifier.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------



#[cfg(test)]
mod fuzz_tests {
    use super::*;

    pub fn fuzz_arbitrary_operations(data: &[u8]) {
        if data.len() < 2 {
            return;
        }

        let capacity = (data[0] as usize % 32).max(1);
        let mut core: CarCore<u8, u8> = CarCore::new(capacity);

        for pair in data[1..].chunks_exact(2) {
            let op = pair[0] % 3;
            let key = pair[1];

            match op {
                0 | 1 => {
                    if core.get(&key).is_none() {
                        core.admit(key, |k, _| Some(*k), |_, _, _| {});
                    }
                },
                2 => {
                    // Admit with no value; later hits must report it as empty.
                    if core.get(&key).is_none() {
                        core.admit(key, |_, _| None, |_, _, _| {});
                        assert_eq!(core.get(&key), Some(None));
                    }
                },
                _ => unreachable!(),
            }

            core.debug_validate_invariants();
            assert!(core.len() <= core.capacity());
        }
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn test_fuzz_smoke() {
        let inputs = vec![
            vec![5, 0, 1, 1, 2, 0, 1, 0, 3, 2, 4, 0, 5],
            vec![10, 0, 7, 0, 8, 1, 7, 0, 9, 2, 10, 0, 1],
            vec![1, 0, 0, 0, 1, 0, 0, 2, 2, 1, 1],
            vec![3, 0, 10, 0, 20, 0, 10, 0, 30, 0, 40, 0, 20, 0, 50],
        ];
        for input in inputs {
            fuzz_arbitrary_operations(&input);
        }
    }

    #[cfg_attr(miri, ignore)]
    #[test]
    fn test_fuzz_eviction_patterns() {
        let mut scan = vec![4];
        for round in 0..4u8 {
            for key in 0..12u8 {
                scan.push(round % 3);
                scan.push(key % (4 + round));
            }
        }
        fuzz_arbitrary_operations(&scan);
    }
}
