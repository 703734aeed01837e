//! Training infrastructure: the epoch loop, parallel cost evaluation,
//! metrics collection, and dashboard message types for live TUI updates.

pub mod dashboard_msg;
pub mod evaluation;
pub mod metrics;
pub mod trainer;
