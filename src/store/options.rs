//! Construction options for [`ConfigStore`](super::ConfigStore).

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::defaults;

/// Options for opening a store.
///
/// # Defaults
///
/// - `filename`: `options.json`
/// - `debounce`: 0 ms
/// - `watch`: enabled
///
/// # Example
///
/// ```
/// use optstore::StoreOptions;
/// use std::time::Duration;
///
/// let options = StoreOptions::new("/var/lib/app")
///     .with_filename("settings.json")
///     .with_debounce(Duration::from_millis(250))
///     .with_watch(false);
///
/// assert_eq!(options.filename(), "settings.json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    directory: PathBuf,
    filename: String,
    debounce: Duration,
    watch: bool,
}

impl StoreOptions {
    /// Creates options for a store in `directory` with default settings.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            filename: defaults::FILENAME.to_string(),
            debounce: defaults::debounce(),
            watch: defaults::WATCH,
        }
    }

    /// Sets the options file name.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Sets the write-back debounce delay.
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Enables or disables watching for external changes.
    #[must_use]
    pub const fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Returns the store directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the options file name.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns the debounce delay.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Returns whether external changes are watched.
    #[must_use]
    pub const fn watch(&self) -> bool {
        self.watch
    }

    /// Returns the full path of the options file.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }
}

impl fmt::Display for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreOptions {{ path: {}, debounce: {}ms, watch: {} }}",
            self.path().display(),
            self.debounce.as_millis(),
            self.watch,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_defaults() {
        let options = StoreOptions::new("/cfg");

        assert_eq!(options.directory(), Path::new("/cfg"));
        assert_eq!(options.filename(), "options.json");
        assert_eq!(options.debounce(), Duration::ZERO);
        assert!(options.watch());
    }

    #[test]
    fn builders_override_defaults() {
        let options = StoreOptions::new("/cfg")
            .with_filename("app.json")
            .with_debounce(Duration::from_millis(500))
            .with_watch(false);

        assert_eq!(options.filename(), "app.json");
        assert_eq!(options.debounce(), Duration::from_millis(500));
        assert!(!options.watch());
    }

    #[test]
    fn path_joins_directory_and_filename() {
        let options = StoreOptions::new("/cfg").with_filename("app.json");
        assert_eq!(options.path(), PathBuf::from("/cfg/app.json"));
    }

    #[test]
    fn display_includes_path_and_settings() {
        let options = StoreOptions::new("/cfg").with_debounce(Duration::from_millis(20));
        let text = options.to_string();

        assert!(text.contains("/cfg/options.json"));
        assert!(text.contains("20ms"));
        assert!(text.contains("watch: true"));
    }
}
