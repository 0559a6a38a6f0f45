//! Directory-backed storage implementation.

use std::io;
use std::path::{Path, PathBuf};

use super::{BackendError, StorageBackend};

/// Filesystem implementation of [`StorageBackend`].
///
/// All names are resolved relative to one directory.
///
/// # Atomic Writes
///
/// Uses write-to-temp-then-rename pattern to prevent torn reads:
/// 1. Write to `{name}.tmp`
/// 2. Rename `{name}.tmp` to `{name}`
///
/// A watcher in another process therefore never observes a half-written
/// document, which would otherwise be reported as a corrupt configuration.
#[derive(Debug, Clone)]
pub struct FsBackend {
    directory: PathBuf,
}

impl FsBackend {
    /// Creates a backend rooted at `directory`.
    ///
    /// The directory does not need to exist yet; it is created on first write.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn write_blocking(directory: &Path, name: &str, bytes: &[u8]) -> io::Result<()> {
        if !directory.as_os_str().is_empty() {
            std::fs::create_dir_all(directory)?;
        }

        let path = directory.join(name);
        // Append .tmp instead of replacing extension to avoid conflicts
        // (e.g., options.json -> options.json.tmp, not options.tmp)
        let temp_path = directory.join(format!("{name}.tmp"));

        std::fs::write(&temp_path, bytes)?;
        std::fs::rename(&temp_path, &path)
    }
}

impl StorageBackend for FsBackend {
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, BackendError> {
        let path = self.directory.join(name);

        tokio::task::spawn_blocking(move || std::fs::read(path))
            .await
            .map_err(io::Error::other)?
            .map_err(BackendError::from_io)
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), BackendError> {
        let directory = self.directory.clone();
        let name = name.to_owned();
        let bytes = bytes.to_vec();

        // Use spawn_blocking to avoid blocking the async runtime
        tokio::task::spawn_blocking(move || Self::write_blocking(&directory, &name, &bytes))
            .await
            .map_err(io::Error::other)?
            .map_err(BackendError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn read_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path());

        let result = backend.read_file("options.json").await;
        assert!(matches!(result, Err(BackendError::NotFound)));
    }

    #[tokio::test]
    async fn write_then_read_returns_same_bytes() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path());

        backend
            .write_file("options.json", br#"{"a":1}"#)
            .await
            .unwrap();

        let bytes = backend.read_file("options.json").await.unwrap();
        assert_eq!(bytes, br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn write_leaves_no_temp_file_behind() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path());

        backend.write_file("options.json", b"{}").await.unwrap();

        assert!(dir.path().join("options.json").exists());
        assert!(!dir.path().join("options.json.tmp").exists());
    }

    #[tokio::test]
    async fn write_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested").join("deeper");
        let backend = FsBackend::new(&nested);

        backend.write_file("options.json", b"{}").await.unwrap();

        assert_eq!(std::fs::read(nested.join("options.json")).unwrap(), b"{}");
    }

    #[tokio::test]
    async fn write_overwrites_existing_contents() {
        let dir = TempDir::new().unwrap();
        let backend = FsBackend::new(dir.path());

        backend.write_file("options.json", b"{\"a\":1}").await.unwrap();
        backend.write_file("options.json", b"{}").await.unwrap();

        assert_eq!(backend.read_file("options.json").await.unwrap(), b"{}");
    }

    #[tokio::test]
    async fn write_into_file_path_fails_with_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let backend = FsBackend::new(&blocker);

        let result = backend.write_file("options.json", b"{}").await;
        assert!(matches!(result, Err(BackendError::Io(_))));
    }
}
