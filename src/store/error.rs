//! Error types for the store.

use std::io;

use thiserror::Error;

use super::codec::CorruptConfig;
use crate::backend::WatchError;

/// Error type for store operations.
///
/// Construction fails only with [`StoreError::MissingDirectory`]. I/O and
/// decode failures are reported to the operation that triggered them, or
/// through [`StoreEvent::Error`](super::StoreEvent::Error) when they occur in
/// the background. None of them leave the in-memory document half-updated.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No directory was configured.
    #[error("A directory is required for the options file")]
    MissingDirectory,

    /// Failed to read the options file.
    #[error("Failed to read '{name}': {source}")]
    Read {
        /// File name inside the store directory
        name: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to write the options file.
    #[error("Failed to write '{name}': {source}")]
    Write {
        /// File name inside the store directory
        name: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The options file does not contain a valid document.
    #[error("Corrupt configuration in '{name}': {source}")]
    Corrupt {
        /// File name inside the store directory
        name: String,
        /// What was wrong with the contents
        #[source]
        source: CorruptConfig,
    },

    /// Failed to serialize the in-memory document.
    #[error("Failed to encode configuration: {0}")]
    Encode(#[source] serde_json::Error),

    /// Failed to subscribe to change notifications.
    #[error("Failed to watch options directory: {0}")]
    Watch(#[from] WatchError),

    /// `init` was called on a store that is already running.
    #[error("Store is already initialized")]
    AlreadyInitialized,

    /// The store is not running (not initialized, or already exited).
    #[error("Store is not running")]
    NotRunning,
}

impl StoreError {
    /// Returns true for [`StoreError::Corrupt`].
    ///
    /// Callers use this to decide between failing hard and starting fresh.
    #[must_use]
    pub const fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }

    /// Returns true for read and write failures.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Write { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn missing_directory_displays_message() {
        assert_eq!(
            StoreError::MissingDirectory.to_string(),
            "A directory is required for the options file"
        );
    }

    #[test]
    fn write_error_displays_file_name_and_preserves_source() {
        let error = StoreError::Write {
            name: "options.json".to_string(),
            source: io::Error::other("disk full"),
        };

        assert!(error.to_string().contains("options.json"));
        assert!(error.to_string().contains("disk full"));
        assert!(error.source().unwrap().to_string().contains("disk full"));
        assert!(error.is_io());
        assert!(!error.is_corrupt());
    }

    #[test]
    fn corrupt_error_is_distinct_from_io() {
        let error = StoreError::Corrupt {
            name: "options.json".to_string(),
            source: CorruptConfig::NotAnObject { found: "array" },
        };

        assert!(error.is_corrupt());
        assert!(!error.is_io());
        assert!(error.to_string().contains("found array"));
    }

    #[test]
    fn from_watch_error_conversion() {
        let watch_error = WatchError::Backend {
            message: "unavailable".to_string(),
        };
        let error: StoreError = watch_error.into();

        assert!(matches!(error, StoreError::Watch(_)));
        assert!(error.to_string().contains("unavailable"));
    }
}
