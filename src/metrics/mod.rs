//! Counters, snapshots and exporters for the CAR engine.
//!
//! Compiled only with the `metrics` feature (on by default).

pub mod cell;
pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;
