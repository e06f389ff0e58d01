//! Graph command implementation.
//!
//! The graph command:
//! 1. Loads and selects records (see `stats`)
//! 2. Builds and prunes the call graph
//! 3. Writes DOT source, or renders it to PNG with the external renderer

use super::models::GraphArgs;
use super::stats::load_selection;
use crate::callgraph::{build_pruned_graph, write_dot, DotRenderer, GraphRenderer, ImageFormat, Theme};
use crate::output::write_image;
use crate::utils::config::{renderer_missing_message, NO_MATCHING_LOG};
use anyhow::{Context, Result};
use log::{debug, info};
use std::time::Instant;

/// Execute the graph command with the renderer described by `args.renderer`
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Export read failures
/// * No record matching the selection
/// * Renderer missing, failing or timing out
/// * File write errors
pub fn execute_graph(args: GraphArgs) -> Result<()> {
    let renderer = DotRenderer::from_config(&args.renderer);
    execute_graph_with(args, &renderer)
}

/// Execute the graph command with an explicit renderer
///
/// **Public** - lets callers and tests swap the renderer
pub fn execute_graph_with(args: GraphArgs, renderer: &dyn GraphRenderer) -> Result<()> {
    let start_time = Instant::now();

    let records = load_selection(&args.selection)?;
    let graph = build_pruned_graph(&records, args.node_thres, args.edge_thres)
        .with_context(|| NO_MATCHING_LOG.to_string())?;
    debug!(
        "Call graph: {} node(s), {} edge(s) after pruning",
        graph.node_count(),
        graph.edge_count()
    );

    let dot = write_dot(&graph, &Theme::temperature());

    let content = if args.dot_only {
        dot.into_bytes()
    } else {
        renderer
            .render(&dot, ImageFormat::Png)
            .with_context(|| renderer_missing_message(renderer.program()))?
    };

    write_image(&content, &args.output).context("Failed to write call graph")?;
    info!("✓ Call graph written to: {}", args.output.display());

    info!(
        "Graph completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}
