//! Replacement policies.

pub mod car;
