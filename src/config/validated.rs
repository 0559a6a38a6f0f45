//! Validated configuration after merging CLI and TOML sources.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::StoreOptions;

use super::cli::{Cli, Command};
use super::defaults;
use super::error::{ConfigError, field};
use super::toml::TomlConfig;

/// Fully validated configuration ready for use by the application.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args and optional TOML config.
/// The function validates all inputs and returns errors for invalid configurations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    /// Directory holding the options file (required)
    pub directory: PathBuf,

    /// Name of the options file
    pub filename: String,

    /// Write-back delay
    pub debounce: Duration,

    /// Whether external changes are watched
    pub watch: bool,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Config {{ path: {}, debounce: {}ms, watch: {} }}",
            self.directory.join(&self.filename).display(),
            self.debounce.as_millis(),
            self.watch,
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration from CLI arguments and optional TOML config.
    ///
    /// CLI arguments take precedence over TOML config values.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory is missing
    /// - The file name is empty or contains a path separator
    /// - The debounce delay exceeds [`defaults::MAX_DEBOUNCE_MS`]
    /// - The `watch` command is combined with watching disabled
    pub fn from_raw(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Self, ConfigError> {
        let section = toml.map(|t| &t.store);

        let directory = cli
            .directory
            .clone()
            .or_else(|| section.and_then(|s| s.directory.clone()))
            .ok_or_else(|| {
                ConfigError::missing(
                    field::DIRECTORY,
                    "Use --directory or set store.directory in config file",
                )
            })?;

        let filename = Self::resolve_filename(cli, toml)?;
        let debounce = Self::resolve_debounce(cli, toml)?;

        // --no-watch can only disable
        let watch = !cli.no_watch && section.and_then(|s| s.watch).unwrap_or(defaults::WATCH);

        if cli.command == Command::Watch && !watch {
            return Err(ConfigError::WatchDisabled);
        }

        Ok(Self {
            directory,
            filename,
            debounce,
            watch,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI and optional config file.
    ///
    /// If `cli.config` is set, loads the TOML file from that path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        Self::from_raw(cli, toml.as_ref())
    }

    /// Builds the store options described by this configuration.
    #[must_use]
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::new(&self.directory)
            .with_filename(&self.filename)
            .with_debounce(self.debounce)
            .with_watch(self.watch)
    }

    fn resolve_filename(cli: &Cli, toml: Option<&TomlConfig>) -> Result<String, ConfigError> {
        // Priority: CLI explicit > TOML > default
        let name = cli
            .filename
            .as_deref()
            .or_else(|| toml.and_then(|t| t.store.filename.as_deref()))
            .unwrap_or(defaults::FILENAME);

        let reason = if name.is_empty() {
            Some("must not be empty")
        } else if name.contains(['/', '\\']) {
            Some("must not contain a path separator")
        } else if name == "." || name == ".." {
            Some("must name a file")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ConfigError::InvalidFilename {
                value: name.to_string(),
                reason,
            }),
            None => Ok(name.to_string()),
        }
    }

    fn resolve_debounce(cli: &Cli, toml: Option<&TomlConfig>) -> Result<Duration, ConfigError> {
        // Priority: CLI explicit > TOML > default
        let millis = cli
            .debounce_ms
            .or_else(|| toml.and_then(|t| t.store.debounce_ms))
            .unwrap_or(defaults::DEBOUNCE_MS);

        if millis > defaults::MAX_DEBOUNCE_MS {
            return Err(ConfigError::InvalidDuration {
                field: "debounce_ms",
                reason: format!("must be at most {}", defaults::MAX_DEBOUNCE_MS),
            });
        }

        Ok(Duration::from_millis(millis))
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}
