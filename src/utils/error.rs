//! Error types for the entire library.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use crate::profile::schema::RequestId;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when reading or writing the profile store
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("No profile recorded for request id: {0}")]
    NotFound(RequestId),

    #[error("A profile is already recorded for request id: {0}")]
    DuplicateId(RequestId),
}

/// Errors that can occur while turning a graph description into an image
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Renderer `{program}` could not be started: {source}")]
    Unavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Renderer `{program}` exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Renderer `{program}` did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("IO error while talking to renderer: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Unsupported export version: {0}")]
    UnsupportedVersion(String),

    #[error("Export is inconsistent: {0}")]
    Inconsistent(#[from] StoreError),
}

/// Errors that can occur while loading profiler configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
