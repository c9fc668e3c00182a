//! # Metrics Trait Hierarchy
//!
//! Separates *recording*, *snapshotting*, and *export* into small traits so
//! the replacement engine never depends on a monitoring backend.
//!
//! ## Architecture
//!
//! ```text
//!   ┌─────────────────────────────┐      ┌─────────────────────────────┐
//!   │     CoreMetricsRecorder     │      │   CoreMetricsReadRecorder   │
//!   │  miss/load/evicted_entry/   │      │  hit (shared lock tier)     │
//!   │  slot_allocated             │      └─────────────────────────────┘
//!   └──────────────┬──────────────┘
//!                  │
//!                  ▼
//!   ┌─────────────────────────────┐
//!   │     CarMetricsRecorder      │
//!   │  promotions, ghost hits,    │
//!   │  target moves, sweeps,      │
//!   │  directory trims            │
//!   └─────────────────────────────┘
//!
//!   Consumption (decoupled from recording):
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │    │ MetricsExporter<S>           │
//!   │ (bench/test)                 │    │ (production monitoring)      │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! Write-path recorders take `&mut self` and run under the exclusive lock
//! tier. The read recorder takes `&self` because hits are served while other
//! readers hold the same shared guard.

/// Counters every replacement engine updates on its write path.
pub trait CoreMetricsRecorder {
    fn record_miss(&mut self);
    fn record_load(&mut self);
    fn record_evicted_entry(&mut self);
    fn record_slot_allocated(&mut self);
}

/// Counters updated from `&self` methods (uses interior mutability).
pub trait CoreMetricsReadRecorder {
    fn record_hit(&self);
}

/// Metrics for CAR behavior (clock with adaptive replacement).
pub trait CarMetricsRecorder: CoreMetricsRecorder {
    fn record_recent_to_frequent_promotion(&mut self);
    fn record_ghost_recent_hit(&mut self);
    fn record_ghost_frequent_hit(&mut self);
    fn record_target_increase(&mut self);
    fn record_target_decrease(&mut self);
    fn record_hand_sweep(&mut self);
    fn record_ghost_recent_trim(&mut self);
    fn record_ghost_frequent_trim(&mut self);
}

/// Snapshot provider for bench/testing.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset metrics between tests or benchmark iterations.
pub trait MetricsReset {
    fn reset_metrics(&self);
}

/// Export/publish metrics to production monitoring backends.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
