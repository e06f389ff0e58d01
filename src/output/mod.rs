//! Output writers for captured profiles and call graphs.
//!
//! This module handles writing data to disk:
//! - JSON profile exports (and reading them back)
//! - Rendered call graph images and DOT source

pub mod image;
pub mod json;

// Re-export main functions
pub use image::write_image;
pub use json::{prepare_output_path, read_profiles, validate_output_path, write_profiles, ProfileExport};
