//! Request Profiler CLI
//!
//! Offline viewer for exported request profiles.
//! Prints merged statistics and renders call graphs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use request_profiler::aggregator::SortKey;
use request_profiler::commands::{
    display_version, execute_graph, execute_stats, validate_graph_args, validate_profile_file,
    GraphArgs, Selection, StatsArgs,
};
use request_profiler::utils::config::{load_config, ProfilerConfig};
use std::path::PathBuf;

/// Request Profiler - per-request profiling for HTTP services
#[derive(Parser, Debug)]
#[command(name = "reqprof")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Profiler configuration file (TOML)
    #[arg(short, long, global = true, env = "REQPROF_CONFIG")]
    config: Option<PathBuf>,
}

/// Record selection flags
#[derive(clap::Args, Debug)]
struct SelectionArgs {
    /// Exported profile file
    #[arg(short, long)]
    input: PathBuf,

    /// Select a single request by id
    #[arg(long)]
    request_id: Option<String>,

    /// Select every request whose path starts with this prefix
    #[arg(long, default_value = "")]
    prefix: String,
}

impl From<SelectionArgs> for Selection {
    fn from(args: SelectionArgs) -> Self {
        Selection {
            input: args.input,
            request_id: args.request_id.filter(|id| !id.is_empty()),
            path_prefix: args.prefix,
        }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print merged statistics for the selected requests
    Stats {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Sort order (cumtime, tottime, ncalls, pcalls, filename, line, name, nfl, stdname)
        #[arg(short, long)]
        sort: Option<String>,
    },

    /// Render the call graph of the selected requests
    Graph {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Drop nodes below this percentage of total time
        #[arg(long)]
        node_thres: Option<f64>,

        /// Drop edges below this percentage of total time
        #[arg(long)]
        edge_thres: Option<f64>,

        /// Output path for the PNG (or DOT source with --dot)
        #[arg(short, long, default_value = "callgraph.png")]
        output: PathBuf,

        /// Write DOT source instead of running the renderer
        #[arg(long)]
        dot: bool,
    },

    /// Validate an exported profile file
    Validate {
        /// Path to profile JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ProfilerConfig::default(),
    };

    // Execute command
    match cli.command {
        Commands::Stats { selection, sort } => {
            let sort_name = sort.as_deref().unwrap_or(&config.default_sort);
            let sort = SortKey::from_name(sort_name)
                .with_context(|| format!("Unknown sort order: {}", sort_name))?;

            execute_stats(StatsArgs {
                selection: selection.into(),
                sort,
            })?;
        }

        Commands::Graph {
            selection,
            node_thres,
            edge_thres,
            output,
            dot,
        } => {
            let args = GraphArgs {
                selection: selection.into(),
                node_thres: node_thres.unwrap_or(config.node_thres),
                edge_thres: edge_thres.unwrap_or(config.edge_thres),
                output,
                dot_only: dot,
                renderer: config.renderer.clone(),
            };

            // Validate args first
            validate_graph_args(&args)?;

            execute_graph(args)?;
        }

        Commands::Validate { file } => {
            validate_profile_file(&file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
