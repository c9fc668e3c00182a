//! carcache: a Clock with Adaptive Replacement (CAR) cache.
//!
//! The engine decides, for a fixed pool of slots, which keys stay resident and
//! how much room to give recently seen keys versus frequently seen ones. It
//! tunes that balance itself from the history of recent evictions.
//!
//! - [`policy::car::CarCore`]: the single-threaded replacement engine.
//! - [`policy::car::CarCache`]: the thread-safe façade with value-loader and
//!   replacement-notifier callbacks.
//! - [`ds`]: the clock ring and ghost list structures the engine is built on.
//!
//! ```
//! use carcache::prelude::*;
//!
//! let cache: CarCache<u32, String> = CarCache::builder(3)
//!     .loader(|key: &u32, slot: SlotId| format!("key {} in slot {}", key, slot))
//!     .build();
//! assert_eq!(cache.load(&42).as_deref(), Some("key 42 in slot 0"));
//! ```

pub mod ds;
pub mod error;
pub mod policy;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod slot;
pub mod traits;
