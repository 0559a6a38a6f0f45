//! Storage and change-notification backends.
//!
//! The store never touches the filesystem directly. It talks to two seams:
//! - [`StorageBackend`]: reads and writes named files inside one directory
//! - [`ChangeNotifier`]: subscribes to change notifications for that directory
//!
//! Implementations:
//! - [`FsBackend`]: a real directory, atomic writes
//! - [`NotifyWatcher`]: OS notifications via the `notify` crate
//! - [`MemoryBackend`]: in-process files and notifications (tests, ephemeral stores)

mod fs;
mod memory;
mod watcher;

pub use fs::FsBackend;
pub use memory::{MemoryBackend, MemoryWatchStream};
pub use watcher::{NotifyStream, NotifyWatcher};

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio_stream::Stream;

/// Error returned by [`StorageBackend`] operations.
///
/// `NotFound` is kept apart from other I/O failures because the store
/// treats a missing file as "no prior data" rather than as an error.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The requested file does not exist.
    #[error("File not found")]
    NotFound,

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl BackendError {
    /// Converts an I/O error, mapping `ErrorKind::NotFound` to [`Self::NotFound`].
    #[must_use]
    pub fn from_io(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(error)
        }
    }

    /// Unwraps the underlying I/O error, synthesizing one for `NotFound`.
    #[must_use]
    pub fn into_io(self) -> io::Error {
        match self {
            Self::NotFound => io::Error::from(io::ErrorKind::NotFound),
            Self::Io(e) => e,
        }
    }
}

/// Error returned when a change subscription cannot be established.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The OS notification layer failed.
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),

    /// The directory to watch did not exist and could not be created.
    #[error("Failed to create directory '{}': {source}", path.display())]
    CreateDirectory {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A non-OS backend refused the subscription.
    #[error("Watch backend error: {message}")]
    Backend {
        /// Description of the failure
        message: String,
    },
}

/// Read/write access to named files in a single directory.
///
/// Implementations should:
/// - Report a missing file as [`BackendError::NotFound`]
/// - Never leave a partially written file visible to readers
pub trait StorageBackend: Send + Sync + 'static {
    /// Reads the full contents of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if the file does not exist,
    /// or [`BackendError::Io`] for any other failure.
    fn read_file(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<u8>, BackendError>> + Send;

    /// Replaces the contents of `name` with `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Io`] if the file cannot be written.
    fn write_file(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Kind of a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    /// File contents were modified (or replaced by a rename).
    Modified,
    /// A file appeared.
    Created,
    /// A file disappeared.
    Removed,
    /// Anything else (metadata, access, unknown).
    Other,
}

/// A single change notification for a file inside the watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// What happened.
    pub kind: WatchEventKind,
    /// File name relative to the watched directory.
    pub name: String,
}

impl WatchEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(kind: WatchEventKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Returns true if this event reports a content change of `filename`.
    ///
    /// Creation, removal and metadata events never qualify, nor do events
    /// for other files in the same directory.
    #[must_use]
    pub fn is_content_change_of(&self, filename: &str) -> bool {
        self.kind == WatchEventKind::Modified && self.name == filename
    }
}

/// Source of change subscriptions for a directory.
///
/// # One Subscription per Store
///
/// The store calls [`ChangeNotifier::watch`] once during `init` and keeps
/// the returned stream until `exit`.
pub trait ChangeNotifier: Send + Sync + 'static {
    /// The stream type returned by `watch`.
    type Stream: WatchStream;

    /// Starts watching `directory` (non-recursively).
    ///
    /// A directory that does not exist yet is created first, the same way
    /// [`StorageBackend::write_file`] would create it.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be established.
    fn watch(&self, directory: &Path) -> Result<Self::Stream, WatchError>;
}

/// An active change subscription.
///
/// Besides yielding [`WatchEvent`]s, a subscription can be suspended: while
/// suspended, events are discarded at the source instead of queued. The
/// store suspends around its own reads and writes of the watched file.
pub trait WatchStream: Stream<Item = WatchEvent> + Send + Unpin + 'static {
    /// Starts discarding events.
    fn suspend(&self);

    /// Stops discarding events.
    fn resume(&self);

    /// Permanently ends the subscription; the stream then terminates.
    fn stop(&mut self);
}
