pub use crate::ds::{ClockRing, GhostList, IntrusiveList, NodeArena, NodeId};
pub use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::CarMetricsSnapshot;
pub use crate::policy::car::{CarCache, CarCacheBuilder, CarCore, Residency};
pub use crate::slot::SlotId;
pub use crate::traits::{ConcurrentCache, ReadOnlyCache, ReplacementNotifier, ValueLoader};
