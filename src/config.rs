//! Configuration management for the schema validator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (subgraph-schemas.toml)
//! - Environment variables (SUBGRAPH_SCHEMAS__*)
//!
//! ## Example config file (subgraph-schemas.toml):
//! ```toml
//! [validation]
//! private_field_pattern = "^_"
//! include_private_fields = false
//! immutability_advisories = true
//! suggest_similar = true
//!
//! [sources]
//! schema_dir = "schemas"
//! extension = "graphql"
//!
//! [output]
//! format = "json"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::graph::BuildOptions;
use crate::validate::ValidationOptions;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Where SDL documents are read from
    #[serde(default)]
    pub sources: SourceConfig,

    /// Report settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Regex marking fields as private; `None` marks nothing
    #[serde(default = "default_private_field_pattern")]
    pub private_field_pattern: Option<String>,

    /// Whether private fields take part in validation
    #[serde(default = "default_true")]
    pub include_private_fields: bool,

    /// Warn when immutable entities derive from mutable ones
    #[serde(default = "default_true")]
    pub immutability_advisories: bool,

    /// Attach "did you mean" suggestions
    #[serde(default = "default_true")]
    pub suggest_similar: bool,
}

/// Source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Directory holding one SDL file per protocol
    #[serde(default = "default_schema_dir")]
    pub schema_dir: PathBuf,

    /// File extension of SDL documents
    #[serde(default = "default_extension")]
    pub extension: String,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Report format for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

// Default value functions
fn default_private_field_pattern() -> Option<String> {
    Some("^_".to_string())
}

fn default_true() -> bool {
    true
}

fn default_schema_dir() -> PathBuf {
    PathBuf::from("schemas")
}

fn default_extension() -> String {
    "graphql".to_string()
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            private_field_pattern: default_private_field_pattern(),
            include_private_fields: true,
            immutability_advisories: true,
            suggest_similar: true,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            schema_dir: default_schema_dir(),
            extension: default_extension(),
        }
    }
}

impl ValidationConfig {
    /// Compile the private-field pattern
    pub fn private_field_regex(&self) -> Result<Option<Regex>> {
        Ok(self.private_field_pattern.as_deref().map(Regex::new).transpose()?)
    }

    pub fn build_options(&self) -> Result<BuildOptions> {
        Ok(BuildOptions {
            private_fields: self.private_field_regex()?,
        })
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            include_private_fields: self.include_private_fields,
            immutability_advisories: self.immutability_advisories,
            suggest_similar: self.suggest_similar,
        }
    }
}

impl SchemaConfig {
    /// Load configuration from default locations, then `config_path` if given
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = [
            "subgraph-schemas.toml",
            ".subgraph-schemas.toml",
            "config/subgraph-schemas.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "subgraph", "subgraph-schemas") {
            let xdg_config = config_dir.config_dir().join("subgraph-schemas.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (SUBGRAPH_SCHEMAS__*)
        builder = builder.add_source(
            Environment::with_prefix("SUBGRAPH_SCHEMAS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Schema directory, resolved against the working directory
    pub fn schema_dir(&self) -> PathBuf {
        if self.sources.schema_dir.is_absolute() {
            self.sources.schema_dir.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.sources.schema_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchemaConfig::default();
        assert_eq!(config.validation.private_field_pattern.as_deref(), Some("^_"));
        assert!(config.validation.include_private_fields);
        assert_eq!(config.sources.extension, "graphql");
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_serialize_config() {
        let config = SchemaConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[validation]"));
        assert!(toml_str.contains("[sources]"));
        assert!(toml_str.contains("[output]"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[validation]\ninclude_private_fields = false\nsuggest_similar = false\n\n[output]\nformat = \"json\"\n",
        )
        .unwrap();

        let config = SchemaConfig::load_from(path.to_str()).unwrap();
        assert!(!config.validation.include_private_fields);
        assert!(!config.validation.suggest_similar);
        assert!(config.validation.immutability_advisories);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");
        let mut config = SchemaConfig::default();
        config.validation.private_field_pattern = Some("^__".into());
        config.save(path.to_str().unwrap()).unwrap();

        let loaded = SchemaConfig::load_from(path.to_str()).unwrap();
        assert_eq!(loaded.validation.private_field_pattern.as_deref(), Some("^__"));
    }

    #[test]
    fn test_private_field_regex() {
        let config = ValidationConfig::default();
        let regex = config.private_field_regex().unwrap().unwrap();
        assert!(regex.is_match("_totalAmountWithdrawn"));
        assert!(!regex.is_match("totalValueLockedUSD"));

        let invalid = ValidationConfig {
            private_field_pattern: Some("([".into()),
            ..Default::default()
        };
        assert!(invalid.private_field_regex().is_err());
    }
}
