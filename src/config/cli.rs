//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// optstore: persistent JSON options store
///
/// Reads and edits a JSON options file, or follows it for changes made
/// by other processes.
#[derive(Debug, Parser)]
#[command(name = "optstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the options file
    #[arg(long, short, global = true)]
    pub directory: Option<PathBuf>,

    /// Name of the options file inside the directory
    #[arg(long = "file", global = true)]
    pub filename: Option<String>,

    /// Delay in milliseconds before changes are written back
    #[arg(long = "debounce-ms", global = true)]
    pub debounce_ms: Option<u64>,

    /// Do not watch the file for external changes
    #[arg(long = "no-watch", global = true)]
    pub no_watch: bool,

    /// Path to configuration file
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// Subcommands for optstore
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Print the value stored under a key
    Get {
        /// Key to look up
        key: String,
    },

    /// Store a value (parsed as JSON, otherwise taken as a string)
    Set {
        /// Key to store under
        key: String,
        /// Value to store
        value: String,
    },

    /// Remove a key
    Delete {
        /// Key to remove
        key: String,
    },

    /// Print the whole options file
    Dump,

    /// Print every external change until interrupted
    Watch,

    /// Generate a default configuration file
    InitConfig {
        /// Output path for the configuration file
        #[arg(long, short, default_value = "optstore.toml")]
        output: PathBuf,
    },
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }

    /// Returns true if this is the init-config command.
    #[must_use]
    pub const fn is_init(&self) -> bool {
        matches!(self.command, Command::InitConfig { .. })
    }
}
