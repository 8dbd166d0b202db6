//! TOML-based configuration for the conflict engine.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! usable [`EngineConfig`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info};

use crate::conflict::sections::DEFAULT_CONTEXT_RADIUS;
use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level engine configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Minimum tracing level: off, trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Section building settings.
    #[serde(default)]
    pub sections: SectionsConfig,

    /// Input limits applied before parsing.
    #[serde(default)]
    pub parser: ParserConfig,

    /// Marker labels used by the in-memory text merger.
    #[serde(default)]
    pub labels: LabelConfig,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            sections: SectionsConfig::default(),
            parser: ParserConfig::default(),
            labels: LabelConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Section building settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionsConfig {
    /// Unchanged lines shown next to each conflict (default 3).
    #[serde(default = "default_context_radius")]
    pub context_radius: usize,
}

fn default_context_radius() -> usize {
    DEFAULT_CONTEXT_RADIUS
}

impl Default for SectionsConfig {
    fn default() -> Self {
        Self {
            context_radius: default_context_radius(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Limits applied to raw merge text before parsing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParserConfig {
    /// Maximum merge text size in bytes; `0` disables the limit
    /// (default 200 KiB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Refuse merge text that contains NUL bytes (default true).
    #[serde(default = "default_true")]
    pub reject_binary: bool,
}

fn default_max_file_size() -> usize {
    200 * 1024
}
fn default_true() -> bool {
    true
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            reject_binary: default_true(),
        }
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// Labels written after `<<<<<<<` and `>>>>>>>` by the text merger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelConfig {
    #[serde(default = "default_our_label")]
    pub ours: String,

    #[serde(default = "default_their_label")]
    pub theirs: String,
}

fn default_our_label() -> String {
    "ours".into()
}
fn default_their_label() -> String {
    "theirs".into()
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            ours: default_our_label(),
            theirs: default_their_label(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & validation
// ---------------------------------------------------------------------------

impl EngineConfig {
    /// Load an [`EngineConfig`] from a TOML file at the given path.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: EngineConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Validate that all values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.parse::<LevelFilter>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "log_level".into(),
                detail: format!("'{}' is not a tracing level", self.log_level),
            });
        }
        if self.sections.context_radius == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sections.context_radius".into(),
                detail: "context radius must be > 0".into(),
            });
        }
        validate_label("labels.ours", &self.labels.ours)?;
        validate_label("labels.theirs", &self.labels.theirs)?;

        Ok(())
    }

    /// Convenience: load and validate in one call.
    pub fn load_and_validate<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

fn validate_label(field: &str, label: &str) -> Result<(), ConfigError> {
    if label.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: "label must not be empty".into(),
        });
    }
    if label.contains(['\n', '\r']) {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            detail: "label must be a single line".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
log_level = "debug"

[sections]
context_radius = 5

[parser]
max_file_size = 1024
reject_binary = false

[labels]
ours = "HEAD"
theirs = "main"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: EngineConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.sections.context_radius, 5);
        assert_eq!(config.parser.max_file_size, 1024);
        assert!(!config.parser.reject_binary);
        assert_eq!(config.labels.ours, "HEAD");
        assert_eq!(config.labels.theirs, "main");
    }

    #[test]
    fn test_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.sections.context_radius, 3);
        assert_eq!(config.parser.max_file_size, 200 * 1024);
        assert!(config.parser.reject_binary);
        assert_eq!(config.labels.ours, "ours");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mergeview.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = EngineConfig::load_and_validate(&path).expect("load failed");
        assert_eq!(config.sections.context_radius, 5);
    }

    #[test]
    fn test_file_not_found() {
        let result = EngineConfig::load_from_file("/nonexistent/mergeview.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[sections\ncontext_radius = ").unwrap();

        let result = EngineConfig::load_from_file(&path);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validate_rejects_zero_radius() {
        let mut config = EngineConfig::default();
        config.sections.context_radius = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "sections.context_radius"
        ));
    }

    #[test]
    fn test_validate_rejects_multiline_label() {
        let mut config = EngineConfig::default();
        config.labels.theirs = "a\nb".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "labels.theirs"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_log_level() {
        let config = EngineConfig {
            log_level: "loud".into(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "log_level"
        ));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config: EngineConfig = toml::from_str(sample_toml()).unwrap();
        let rendered = config.to_toml().unwrap();
        let reparsed: EngineConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(reparsed, config);
    }
}
