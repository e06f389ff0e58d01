use crate::aggregator::SortKey;
use crate::output::validate_output_path;
use crate::utils::config::{RendererConfig, DEFAULT_EDGE_THRES, DEFAULT_NODE_THRES};
use anyhow::Result;
use std::path::PathBuf;

/// Record selection shared by the offline commands
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Exported profile file
    pub input: PathBuf,

    /// Select a single request by id
    pub request_id: Option<String>,

    /// Select every request whose path starts with this prefix
    pub path_prefix: String,
}

/// Arguments for the stats command
#[derive(Debug, Clone, Default)]
pub struct StatsArgs {
    pub selection: Selection,

    /// Sort order of the table
    pub sort: SortKey,
}

/// Arguments for the graph command
#[derive(Debug, Clone)]
pub struct GraphArgs {
    pub selection: Selection,

    /// Node threshold in percent
    pub node_thres: f64,

    /// Edge threshold in percent
    pub edge_thres: f64,

    /// Output path for the image (or DOT source)
    pub output: PathBuf,

    /// Write DOT source instead of running the renderer
    pub dot_only: bool,

    /// External renderer settings
    pub renderer: RendererConfig,
}

impl Default for GraphArgs {
    fn default() -> Self {
        Self {
            selection: Selection::default(),
            node_thres: DEFAULT_NODE_THRES,
            edge_thres: DEFAULT_EDGE_THRES,
            output: PathBuf::from("callgraph.png"),
            dot_only: false,
            renderer: RendererConfig::default(),
        }
    }
}

/// Validate graph arguments
///
/// **Public** - can be called before execute_graph for early validation
///
/// # Returns
/// Ok if arguments are valid, Err with message if not
pub fn validate_graph_args(args: &GraphArgs) -> Result<()> {
    if args.selection.input.as_os_str().is_empty() {
        anyhow::bail!("Input file cannot be empty");
    }

    validate_output_path(&args.output)?;

    for (name, value) in [("node_thres", args.node_thres), ("edge_thres", args.edge_thres)] {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            anyhow::bail!("{} must be between 0 and 100, got {}", name, value);
        }
    }

    if !args.dot_only && args.renderer.program.is_empty() {
        anyhow::bail!("Renderer program cannot be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_args() -> GraphArgs {
        GraphArgs {
            selection: Selection {
                input: PathBuf::from("profiles.json"),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_graph_args_valid() {
        assert!(validate_graph_args(&valid_args()).is_ok());
    }

    #[test]
    fn test_validate_graph_args_empty_input() {
        let args = GraphArgs {
            selection: Selection::default(),
            ..valid_args()
        };
        assert!(validate_graph_args(&args).is_err());
    }

    #[test]
    fn test_validate_graph_args_empty_output() {
        let args = GraphArgs {
            output: PathBuf::new(),
            ..valid_args()
        };
        assert!(validate_graph_args(&args).is_err());
    }

    #[test]
    fn test_validate_graph_args_directory_output() {
        let temp_dir = tempfile::tempdir().unwrap();
        let args = GraphArgs {
            output: temp_dir.path().to_path_buf(),
            ..valid_args()
        };
        assert!(validate_graph_args(&args).is_err());
    }

    #[test]
    fn test_validate_graph_args_threshold_range() {
        let args = GraphArgs {
            node_thres: 100.5,
            ..valid_args()
        };
        assert!(validate_graph_args(&args).is_err());

        let args = GraphArgs {
            edge_thres: -1.0,
            ..valid_args()
        };
        assert!(validate_graph_args(&args).is_err());

        let args = GraphArgs {
            node_thres: 100.0,
            edge_thres: 0.0,
            ..valid_args()
        };
        assert!(validate_graph_args(&args).is_ok());
    }

    #[test]
    fn test_validate_graph_args_dot_only_skips_renderer() {
        let mut args = valid_args();
        args.renderer.program = String::new();
        assert!(validate_graph_args(&args).is_err());

        args.dot_only = true;
        assert!(validate_graph_args(&args).is_ok());
    }
}
