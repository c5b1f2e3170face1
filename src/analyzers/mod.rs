//! Per-interval metrics and window aggregation.
//!
//! Each interval's record is turned into [`DerivedMetrics`](types::DerivedMetrics)
//! (or an unavailable status with a reason), then the available intervals
//! are folded into a [`WindowSummary`](types::WindowSummary).

pub mod aggregate;
pub mod metrics;
pub mod types;
pub mod utility;
