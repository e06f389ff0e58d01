//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod graph;
pub mod models;
pub mod stats;
pub mod utils;

// Re-export main command functions
pub use graph::{execute_graph, execute_graph_with};
pub use models::{validate_graph_args, GraphArgs, Selection, StatsArgs};
pub use stats::{execute_stats, load_selection, render_stats_report};
pub use utils::{display_version, validate_profile_file};
