//! Aggregation of profile records into combined statistics.
//!
//! This module transforms stored records into:
//! - A merged, mutable accumulator (for call graph building)
//! - A sorted statistics view
//! - A plain-text statistics dump

pub mod report;
pub mod stats;

// Re-export main types and functions
pub use report::render_stats;
pub use stats::{aggregate, AggregatedStats, SortKey, StatsAccumulator};
