//! Configuration and constants for the profiler.

use super::error::ConfigError;
use crate::aggregator::SortKey;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Path prefix the viewer is mounted under
pub const DEFAULT_VIEWER_PREFIX: &str = "/__profile__";

/// Default node pruning threshold (percent of total time)
pub const DEFAULT_NODE_THRES: f64 = 0.5;

/// Default edge pruning threshold (percent of total time)
pub const DEFAULT_EDGE_THRES: f64 = 0.1;

/// Default sort order for the statistics view
pub const DEFAULT_SORT: &str = "cumtime";

/// Graph renderer executable
pub const DEFAULT_RENDERER_PROGRAM: &str = "dot";

/// How long the renderer may run before it is killed
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Current export schema version
pub const EXPORT_VERSION: &str = "1.0.0";

/// Shown whenever a viewer lookup resolves to no records
pub const NO_MATCHING_LOG: &str = "No matching log.";

/// Operator-facing diagnostic for a missing or failing renderer
pub fn renderer_missing_message(program: &str) -> String {
    format!(
        "ERROR: Failed to execute \"{}\". Please install graphviz.",
        program
    )
}

/// Complete profiler configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Reserved path prefix of the viewer (e.g. "/__profile__")
    pub viewer_prefix: String,

    /// Append the "Profiler: ... Details" fragment to HTML responses
    pub inject_link: bool,

    /// Sort order used when the viewer gets no `sort` parameter
    pub default_sort: String,

    /// Node threshold used when the viewer gets no `node_thres` parameter
    pub node_thres: f64,

    /// Edge threshold used when the viewer gets no `edge_thres` parameter
    pub edge_thres: f64,

    /// External graph renderer settings
    pub renderer: RendererConfig,
}

/// External renderer settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Program invoked as `<program> [args...] -T<format>`
    pub program: String,

    /// Extra arguments placed before the format flag
    pub args: Vec<String>,

    /// Seconds before the renderer is killed
    pub timeout_secs: u64,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            viewer_prefix: DEFAULT_VIEWER_PREFIX.to_string(),
            inject_link: true,
            default_sort: DEFAULT_SORT.to_string(),
            node_thres: DEFAULT_NODE_THRES,
            edge_thres: DEFAULT_EDGE_THRES,
            renderer: RendererConfig::default(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_RENDERER_PROGRAM.to_string(),
            args: Vec::new(),
            timeout_secs: DEFAULT_RENDER_TIMEOUT.as_secs(),
        }
    }
}

impl RendererConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ProfilerConfig {
    /// Check invariants and normalize the viewer prefix
    ///
    /// The prefix must start with `/`; trailing slashes are dropped so
    /// routes can be built as `<prefix>/tree.png`.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if !self.viewer_prefix.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "viewer_prefix must start with '/': {}",
                self.viewer_prefix
            )));
        }
        let trimmed = self.viewer_prefix.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::Invalid(
                "viewer_prefix cannot be the site root".to_string(),
            ));
        }
        self.viewer_prefix = trimmed.to_string();

        for (name, value) in [("node_thres", self.node_thres), ("edge_thres", self.edge_thres)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within 0..=100, got {}",
                    name, value
                )));
            }
        }

        if SortKey::from_name(&self.default_sort).is_none() {
            return Err(ConfigError::Invalid(format!(
                "default_sort is not a known sort order: {}",
                self.default_sort
            )));
        }

        if self.renderer.program.is_empty() {
            return Err(ConfigError::Invalid(
                "renderer.program cannot be empty".to_string(),
            ));
        }

        Ok(self)
    }
}

/// Load profiler configuration from a TOML file
///
/// # Errors
/// * `ConfigError::Io` - If file cannot be read
/// * `ConfigError::Parse` - If TOML is invalid
/// * `ConfigError::Invalid` - If a value is out of range
///
/// # Example
/// ```ignore
/// let config = load_config("profiler.toml")?;
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ProfilerConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse profiler configuration from a TOML string
pub fn parse_config(contents: &str) -> Result<ProfilerConfig, ConfigError> {
    let config: ProfilerConfig = toml::from_str(contents)?;
    config.validated()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ProfilerConfig::default());
        assert_eq!(config.renderer.timeout(), DEFAULT_RENDER_TIMEOUT);
    }

    #[test]
    fn test_partial_config() {
        let config = parse_config(
            r#"
viewer_prefix = "/_prof/"
node_thres = 1.5

[renderer]
timeout_secs = 3
"#,
        )
        .unwrap();

        assert_eq!(config.viewer_prefix, "/_prof");
        assert_eq!(config.node_thres, 1.5);
        assert_eq!(config.edge_thres, DEFAULT_EDGE_THRES);
        assert_eq!(config.renderer.program, "dot");
        assert_eq!(config.renderer.timeout_secs, 3);
    }

    #[test]
    fn test_prefix_must_be_absolute() {
        let result = parse_config(r#"viewer_prefix = "profile""#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_root_prefix_rejected() {
        let result = parse_config(r#"viewer_prefix = "/""#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let result = parse_config("edge_thres = 150.0");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_default_sort() {
        let result = parse_config(r#"default_sort = "fastest""#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_toml() {
        let result = parse_config("node_thres = \"lots\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_renderer_message_names_program() {
        let message = renderer_missing_message("dot");
        assert_eq!(
            message,
            "ERROR: Failed to execute \"dot\". Please install graphviz."
        );
    }
}
