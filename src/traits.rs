//! # Cache Traits
//!
//! The seams between the CAR engine and the outside world.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────┐        ┌───────────────────────────────────┐
//!   │      ReadOnlyCache<K, V>     │        │   External collaborators          │
//!   │                              │        │                                   │
//!   │  contains(&K) → bool         │        │  ValueLoader<K, V>                │
//!   │  len() → usize               │        │    load(&K, SlotId) → V           │
//!   │  is_empty() → bool           │        │                                   │
//!   │  capacity() → usize          │        │  ReplacementNotifier<K, V>        │
//!   └──────────────┬───────────────┘        │    replaced(&K, Option<V>, SlotId)│
//!                  │                        └─────────────────┬─────────────────┘
//!         ┌────────┴─────────┐                                │ invoked on miss path
//!         ▼                  ▼                                ▼
//!   ┌───────────┐     ┌──────────────┐             ┌──────────────────────┐
//!   │  CarCore  │     │   CarCache   │ ◄────────── │ exclusive lock tier  │
//!   └───────────┘     │ + Concurrent │             └──────────────────────┘
//!                     │   Cache      │
//!                     └──────────────┘
//! ```
//!
//! ## Callback contracts
//!
//! - [`ReplacementNotifier::replaced`] runs exactly once per eviction, with the
//!   evicted key, its value (moved out of the slot) and the vacated slot.
//!   It runs before the next key's loader is given that slot.
//! - [`ValueLoader::load`] runs once per miss, after the notifier. It
//!   receives the slot the value will occupy.
//!
//! Both run while the cache holds its exclusive lock. They must not call back
//! into the same cache; doing so deadlocks.
//!
//! The directory is updated before either callback runs. A panicking callback
//! fails only its own request: the key stays resident with an empty slot,
//! and the next `load` of that key calls the loader again.
//!
//! Plain closures implement both traits:
//!
//! ```
//! use carcache::policy::car::CarCache;
//! use carcache::slot::SlotId;
//!
//! let cache: CarCache<u32, String> = CarCache::new(2);
//! cache.set_loader(|key: &u32, slot: SlotId| format!("{}@{}", key, slot));
//! cache.set_replacement_notifier(|key: &u32, _value: Option<String>, slot: SlotId| {
//!     println!("key {} left slot {}", key, slot);
//! });
//! assert_eq!(cache.load(&7).as_deref(), Some("7@0"));
//! ```

use crate::slot::SlotId;

/// Read-only inspection shared by the engine and the façade.
///
/// None of these methods set reference bits or otherwise influence
/// replacement decisions.
pub trait ReadOnlyCache<K, V> {
    /// Returns `true` if `key` currently owns a slot.
    fn contains(&self, key: &K) -> bool;

    /// Returns the number of resident entries (`|T1| + |T2|`).
    fn len(&self) -> usize;

    /// Returns `true` if no entry is resident.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the fixed slot capacity `c`.
    fn capacity(&self) -> usize;
}

/// Produces the value for a key that missed.
///
/// Must behave as a pure function of its inputs from the cache's point of
/// view: no reentrant calls into the cache.
pub trait ValueLoader<K, V>: Send + Sync {
    /// Loads the value for `key`, which is about to occupy `slot`.
    fn load(&self, key: &K, slot: SlotId) -> V;
}

impl<K, V, F> ValueLoader<K, V> for F
where
    F: Fn(&K, SlotId) -> V + Send + Sync,
{
    #[inline]
    fn load(&self, key: &K, slot: SlotId) -> V {
        self(key, slot)
    }
}

/// Observes evictions.
///
/// Lets an external fixed-capacity store indexed by [`SlotId`] release or
/// overwrite the vacated position.
pub trait ReplacementNotifier<K, V>: Send + Sync {
    /// Called with the evicted key, its value and the slot being vacated.
    ///
    /// `value` is `None` only if the slot never received a value (no loader
    /// was configured when the key was admitted).
    fn replaced(&self, key: &K, value: Option<V>, slot: SlotId);
}

impl<K, V, F> ReplacementNotifier<K, V> for F
where
    F: Fn(&K, Option<V>, SlotId) + Send + Sync,
{
    #[inline]
    fn replaced(&self, key: &K, value: Option<V>, slot: SlotId) {
        self(key, value, slot)
    }
}

/// Marker trait for caches that are safe to share across threads.
///
/// Implementors guarantee thread-safe operations. This trait extends
/// `Send + Sync` and can be used as a bound to require concurrent access.
///
/// # Example
///
/// ```
/// use carcache::policy::car::CarCache;
/// use carcache::traits::ConcurrentCache;
///
/// fn share<C: ConcurrentCache + Clone + 'static>(cache: &C) {
///     let handle = cache.clone();
///     std::thread::spawn(move || drop(handle)).join().unwrap();
/// }
///
/// share(&CarCache::<u64, u64>::new(8));
/// ```
pub trait ConcurrentCache: Send + Sync {}
