//! Call graph construction, pruning and rendering.
//!
//! This module converts merged statistics into a weighted call graph,
//! prunes it by node and edge thresholds, serializes it as DOT with a
//! temperature color scale and hands it to an external renderer.

pub mod builder;
pub mod dot;
pub mod render;

// Re-export main types
pub use builder::{CallGraph, Edge, Node};
pub use dot::{write_dot, Theme};
pub use render::{DotRenderer, GraphRenderer, ImageFormat};

use crate::aggregator::aggregate;
use crate::profile::schema::ProfileRecord;

/// Merge `records` and build a call graph pruned at the given percentages
///
/// Returns `None` when there are no records.
pub fn build_pruned_graph(records: &[ProfileRecord], node_thres: f64, edge_thres: f64) -> Option<CallGraph> {
    let accumulator = aggregate(records)?;
    let mut graph = CallGraph::from_data(accumulator.data());
    graph.prune(node_thres, edge_thres);
    Some(graph)
}
