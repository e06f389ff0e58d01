//! Call graph image output writer.
//!
//! Writes rendered graph bytes (PNG, SVG or DOT source) to files.

use super::json::prepare_output_path;
use crate::utils::error::OutputError;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write rendered image bytes to a file
///
/// **Public** - main entry point for graph output
///
/// # Arguments
/// * `content` - Bytes produced by a `GraphRenderer`, or DOT source
/// * `output_path` - Path to output file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::InvalidPath` - Path is invalid
///
/// # Example
/// ```ignore
/// let png = renderer.render(&write_dot(&graph, &theme), ImageFormat::Png)?;
/// write_image(&png, "callgraph.png")?;
/// ```
pub fn write_image(content: &[u8], output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing call graph to: {}", output_path.display());

    prepare_output_path(output_path)?;

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(content).map_err(OutputError::WriteFailed)?;
    writer.flush().map_err(OutputError::WriteFailed)?;

    info!(
        "Call graph written successfully ({} bytes, {:.2} KB)",
        content.len(),
        content.len() as f64 / 1024.0
    );

    Ok(())
}
