//! Configuration layer for the optstore command-line tool.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML config file** - Values from the `[store]` section
//! 3. **Built-in defaults** - See [`crate::store::defaults`]
//!
//! The store directory has no default and must come from `--directory` or
//! `store.directory`.
//!
//! # Boolean Flag Semantics
//!
//! `--no-watch` only disables watching. If the TOML file sets
//! `watch = false`, there is no CLI flag to turn it back on.

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod cli_tests;
#[cfg(test)]
mod validated_tests;

pub use cli::{Cli, Command};
pub use error::{ConfigError, field};
pub use toml::{StoreSection, TomlConfig, default_config_template};
pub use validated::{ValidatedConfig, write_default_config};
