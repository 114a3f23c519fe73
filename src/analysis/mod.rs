//! Metric calculation.
//!
//! Pure functions only: aggregation over loaded tables and descriptive
//! statistics over the resulting series. Nothing here touches the file
//! system or the renderer.

pub mod aggregator;
pub mod metrics;
pub mod stats;

pub use aggregator::*;
pub use metrics::Metrics;
pub use stats::*;
