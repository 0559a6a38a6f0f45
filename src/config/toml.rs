//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Options store section
    #[serde(default)]
    pub store: StoreSection,
}

/// Options store configuration section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Directory holding the options file
    pub directory: Option<PathBuf>,

    /// Name of the options file
    pub filename: Option<String>,

    /// Write-back delay in milliseconds
    pub debounce_ms: Option<u64>,

    /// Watch the file for external changes
    pub watch: Option<bool>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# optstore configuration file

[store]
# Directory holding the options file (required)
# directory = "/var/lib/myapp"

# Name of the options file (default: "options.json")
# filename = "options.json"

# Delay in milliseconds before changes are written back (default: 0)
# Mutations made within the delay are written together.
# debounce_ms = 0

# Watch the file for changes made by other processes (default: true)
# watch = true
"#
    .to_string()
}
