//! Stats command implementation.
//!
//! The stats command:
//! 1. Loads an exported profile file
//! 2. Selects records by request id or path prefix
//! 3. Merges them and prints the statistics table

use super::models::{Selection, StatsArgs};
use crate::aggregator::{aggregate, render_stats};
use crate::output::read_profiles;
use crate::profile::{ProfileRecord, RequestId};
use crate::utils::config::NO_MATCHING_LOG;
use anyhow::{Context, Result};
use log::{debug, info};

/// Load the export named by `selection` and resolve the selected records
///
/// **Public** - shared by the stats and graph commands
pub fn load_selection(selection: &Selection) -> Result<Vec<ProfileRecord>> {
    let export = read_profiles(&selection.input)
        .with_context(|| format!("Failed to read profiles from {}", selection.input.display()))?;
    debug!("Loaded {} record(s)", export.records.len());

    let store = export
        .into_store()
        .context("Profile export is inconsistent")?;
    let request_id = selection.request_id.as_deref().map(RequestId::new);

    Ok(store.resolve(request_id.as_ref(), &selection.path_prefix))
}

/// Build the statistics table for the selected records
///
/// **Public** - returns the text that `execute_stats` prints
///
/// # Returns
/// The table, or `No matching log.` when nothing was selected
pub fn render_stats_report(args: &StatsArgs) -> Result<String> {
    let records = load_selection(&args.selection)?;

    let Some(mut accumulator) = aggregate(&records) else {
        info!("No records matched the selection");
        return Ok(NO_MATCHING_LOG.to_string());
    };

    accumulator.strip_dirs();
    let stats = accumulator.sort(args.sort);
    info!(
        "Merged {} record(s), {} function(s)",
        stats.record_count(),
        stats.entries().len()
    );

    Ok(render_stats(&stats))
}

/// Execute the stats command
///
/// **Public** - main entry point called from main.rs
pub fn execute_stats(args: StatsArgs) -> Result<()> {
    let report = render_stats_report(&args)?;
    println!("{}", report);
    Ok(())
}
