//! JSON profile export.
//!
//! Writes captured records to a versioned JSON document and reads them back
//! for offline viewing.

use crate::profile::{ProfileRecord, ProfileStore};
use crate::utils::config::EXPORT_VERSION;
use crate::utils::error::OutputError;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// On-disk export document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileExport {
    /// Export schema version
    pub version: String,

    /// When the export was written
    pub generated_at: DateTime<Utc>,

    /// Records in arrival order
    pub records: Vec<ProfileRecord>,
}

impl ProfileExport {
    pub fn new(records: Vec<ProfileRecord>) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            generated_at: Utc::now(),
            records,
        }
    }

    /// Rebuild a store holding every exported record
    ///
    /// # Errors
    /// * `OutputError::Inconsistent` - If two records share a request id
    pub fn into_store(self) -> Result<ProfileStore, OutputError> {
        Ok(ProfileStore::from_records(self.records)?)
    }
}

/// Write records to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `records` - Records to export, usually `ProfileStore::snapshot()`
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
///
/// # Example
/// ```ignore
/// write_profiles(&store.snapshot(), "profiles.json")?;
/// ```
pub fn write_profiles(records: &[ProfileRecord], output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!(
        "Writing {} profile(s) to: {}",
        records.len(),
        output_path.display()
    );

    prepare_output_path(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let writer = BufWriter::new(file);

    let export = ProfileExport::new(records.to_vec());
    serde_json::to_writer_pretty(writer, &export).map_err(OutputError::SerializationFailed)?;

    info!(
        "Profiles written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Read an export from a JSON file
///
/// **Public** - used by the CLI and for validation
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error
/// * `OutputError::SerializationFailed` - JSON parse error
/// * `OutputError::UnsupportedVersion` - Export written by an incompatible version
pub fn read_profiles(input_path: impl AsRef<Path>) -> Result<ProfileExport, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading profiles from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let export: ProfileExport =
        serde_json::from_reader(BufReader::new(file)).map_err(OutputError::SerializationFailed)?;

    if major_version(&export.version) != major_version(EXPORT_VERSION) {
        return Err(OutputError::UnsupportedVersion(export.version));
    }

    debug!(
        "Export loaded: version {}, {} record(s)",
        export.version,
        export.records.len()
    );

    Ok(export)
}

fn major_version(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Validate that an output path is writable and create its parent directories
///
/// **Public** - shared by every file writer
pub fn prepare_output_path(path: &Path) -> Result<(), OutputError> {
    validate_output_path(path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}

/// Validate that output path is usable
///
/// **Public** - also used by CLI argument validation
pub fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Calculate file size in bytes
///
/// **Private** - internal utility
fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
