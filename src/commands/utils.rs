use crate::output::read_profiles;
use crate::utils::config::EXPORT_VERSION;
use anyhow::Result;
use colored::*;
use std::collections::BTreeSet;
use std::path::Path;

/// Validate an exported profile file
pub fn validate_profile_file(file_path: &Path) -> Result<()> {
    println!("Validating profiles: {}", file_path.display());

    let export = read_profiles(file_path)?;
    export.clone().into_store()?;

    let paths: BTreeSet<&str> = export.records.iter().map(|r| r.path()).collect();
    let functions: usize = export.records.iter().map(|r| r.data().len()).sum();

    println!("{}", "✓ Valid profile export".green().bold());
    println!("  Version: {}", export.version);
    println!("  Generated: {}", export.generated_at.to_rfc3339());
    println!("  Records: {}", export.records.len());
    println!("  Distinct paths: {}", paths.len());
    println!("  Function entries: {}", functions);

    Ok(())
}

/// Display version information
pub fn display_version() {
    println!(
        "{} v{}",
        "Request Profiler".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("Export Schema: v{}", EXPORT_VERSION);
    println!();
    println!("Per-request profiling middleware with a built-in statistics and call graph viewer.");
}
