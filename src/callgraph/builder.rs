//! Build and prune a weighted call graph from merged statistics.
//!
//! Nodes are functions, edges are caller -> callee relationships. Weights are
//! fractions of the profile's total time, where the total is the largest
//! cumulative time observed (the request root).

use crate::profile::schema::{FunctionKey, ProfileData};
use log::debug;
use std::collections::BTreeMap;
use std::path::Path;

/// One function in the call graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub key: FunctionKey,
    pub label: String,
    pub calls: u64,
    pub total_time: f64,
    pub cumulative_time: f64,

    /// Cumulative time as a fraction of the graph total
    pub weight: f64,

    /// Internal time as a fraction of all internal time
    pub self_weight: f64,
}

/// One caller -> callee relationship
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub caller: FunctionKey,
    pub callee: FunctionKey,
    pub calls: u64,
    pub cumulative_time: f64,

    /// Cumulative time through this edge as a fraction of the graph total
    pub weight: f64,
}

/// Weighted call graph
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    nodes: BTreeMap<FunctionKey, Node>,
    edges: BTreeMap<(FunctionKey, FunctionKey), Edge>,
    total_time: f64,
}

/// Graph label for a function: `module:line:name`, or the standard name for
/// built-ins
pub fn node_label(key: &FunctionKey) -> String {
    if key.is_builtin() {
        return key.std_string();
    }
    let module = Path::new(&key.file)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| key.file.clone());
    format!("{}:{}:{}", module, key.line, key.name)
}

fn ratio(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total
    } else {
        0.0
    }
}

/// A weight falls below a threshold fraction. A full (100%) threshold
/// discards everything.
fn is_below(weight: f64, threshold: f64) -> bool {
    threshold >= 1.0 || weight < threshold
}

impl CallGraph {
    /// Build one node per function and one edge per observed caller
    pub fn from_data(data: &ProfileData) -> Self {
        let mut nodes: BTreeMap<FunctionKey, Node> = BTreeMap::new();
        let mut edges: BTreeMap<(FunctionKey, FunctionKey), Edge> = BTreeMap::new();

        let total_time = data
            .iter()
            .map(|(_, stats)| stats.calls.cumulative_time)
            .fold(0.0_f64, f64::max);
        let total_internal = data.total_time();

        for (key, stats) in data.iter() {
            nodes.insert(
                key.clone(),
                Node {
                    key: key.clone(),
                    label: node_label(key),
                    calls: stats.calls.total_calls,
                    total_time: stats.calls.total_time,
                    cumulative_time: stats.calls.cumulative_time,
                    weight: ratio(stats.calls.cumulative_time, total_time),
                    self_weight: ratio(stats.calls.total_time, total_internal),
                },
            );

            for (caller, call) in &stats.callers {
                let edge = edges
                    .entry((caller.clone(), key.clone()))
                    .or_insert_with(|| Edge {
                        caller: caller.clone(),
                        callee: key.clone(),
                        calls: 0,
                        cumulative_time: 0.0,
                        weight: 0.0,
                    });
                edge.calls += call.total_calls;
                edge.cumulative_time += call.cumulative_time;
                edge.weight = ratio(edge.cumulative_time, total_time);
            }
        }

        // Callers that never reported their own stats still get a node
        for (caller, _) in edges.keys() {
            if !nodes.contains_key(caller) {
                nodes.insert(
                    caller.clone(),
                    Node {
                        key: caller.clone(),
                        label: node_label(caller),
                        calls: 0,
                        total_time: 0.0,
                        cumulative_time: 0.0,
                        weight: 0.0,
                        self_weight: 0.0,
                    },
                );
            }
        }

        debug!(
            "Built call graph with {} nodes and {} edges",
            nodes.len(),
            edges.len()
        );

        Self {
            nodes,
            edges,
            total_time,
        }
    }

    /// Remove nodes and edges below the given thresholds
    ///
    /// # Arguments
    /// * `node_thres` - node threshold in percent (0..=100)
    /// * `edge_thres` - edge threshold in percent (0..=100)
    ///
    /// Removing a node also removes every edge touching it.
    pub fn prune(&mut self, node_thres: f64, edge_thres: f64) {
        let node_fraction = node_thres / 100.0;
        let edge_fraction = edge_thres / 100.0;
        let before = (self.nodes.len(), self.edges.len());

        self.nodes
            .retain(|_, node| !is_below(node.weight, node_fraction));

        let nodes = &self.nodes;
        self.edges.retain(|(caller, callee), edge| {
            nodes.contains_key(caller)
                && nodes.contains_key(callee)
                && !is_below(edge.weight, edge_fraction)
        });

        debug!(
            "Pruned call graph from {}/{} to {}/{} nodes/edges",
            before.0,
            before.1,
            self.nodes.len(),
            self.edges.len()
        );
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node(&self, key: &FunctionKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn edge(&self, caller: &FunctionKey, callee: &FunctionKey) -> Option<&Edge> {
        self.edges.get(&(caller.clone(), callee.clone()))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Time all weights are relative to (seconds)
    pub fn total_time(&self) -> f64 {
        self.total_time
    }
}
