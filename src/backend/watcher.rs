//! OS change notifications via the `notify` crate.

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{ChangeNotifier, WatchError, WatchEvent, WatchEventKind, WatchStream};

impl From<&EventKind> for WatchEventKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Modify(ModifyKind::Metadata(_)) => Self::Other,
            EventKind::Modify(_) => Self::Modified,
            EventKind::Create(_) => Self::Created,
            EventKind::Remove(_) => Self::Removed,
            _ => Self::Other,
        }
    }
}

/// [`ChangeNotifier`] backed by the platform's recommended `notify` watcher
/// (inotify, FSEvents, `ReadDirectoryChangesW`, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyWatcher;

impl NotifyWatcher {
    /// Creates a new notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ChangeNotifier for NotifyWatcher {
    type Stream = NotifyStream;

    fn watch(&self, directory: &Path) -> Result<Self::Stream, WatchError> {
        std::fs::create_dir_all(directory).map_err(|e| WatchError::CreateDirectory {
            path: directory.to_path_buf(),
            source: e,
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let suspended = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&suspended);

        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                let event = match result {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("File watch error: {e}");
                        return;
                    }
                };

                if flag.load(Ordering::SeqCst) {
                    return;
                }

                let kind = WatchEventKind::from(&event.kind);
                for path in &event.paths {
                    let Some(name) = path.file_name() else {
                        continue;
                    };
                    // Receiver gone means the stream was stopped
                    let _ = tx.send(WatchEvent::new(kind, name.to_string_lossy()));
                }
            })?;

        watcher.watch(directory, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching directory: {}", directory.display());

        Ok(NotifyStream {
            watcher: Some(watcher),
            events: UnboundedReceiverStream::new(rx),
            suspended,
        })
    }
}

/// Stream of [`WatchEvent`]s produced by [`NotifyWatcher`].
///
/// Dropping the stream stops the underlying OS watcher.
pub struct NotifyStream {
    watcher: Option<RecommendedWatcher>,
    events: UnboundedReceiverStream<WatchEvent>,
    suspended: Arc<AtomicBool>,
}

impl std::fmt::Debug for NotifyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyStream")
            .field("active", &self.watcher.is_some())
            .field("suspended", &self.suspended.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Stream for NotifyStream {
    type Item = WatchEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl WatchStream for NotifyStream {
    fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.suspended.store(false, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        // Dropping the watcher drops the callback and with it the sender
        self.watcher = None;
        self.events.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};

    #[test]
    fn data_modification_maps_to_modified() {
        let kind = EventKind::Modify(ModifyKind::Data(DataChange::Content));
        assert_eq!(WatchEventKind::from(&kind), WatchEventKind::Modified);
    }

    #[test]
    fn rename_into_place_maps_to_modified() {
        let kind = EventKind::Modify(ModifyKind::Name(RenameMode::To));
        assert_eq!(WatchEventKind::from(&kind), WatchEventKind::Modified);
    }

    #[test]
    fn metadata_change_maps_to_other() {
        let kind = EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime));
        assert_eq!(WatchEventKind::from(&kind), WatchEventKind::Other);
    }

    #[test]
    fn create_and_remove_map_to_their_kinds() {
        let created = EventKind::Create(CreateKind::File);
        let removed = EventKind::Remove(RemoveKind::File);

        assert_eq!(WatchEventKind::from(&created), WatchEventKind::Created);
        assert_eq!(WatchEventKind::from(&removed), WatchEventKind::Removed);
    }

    #[test]
    fn access_maps_to_other() {
        let kind = EventKind::Access(AccessKind::Any);
        assert_eq!(WatchEventKind::from(&kind), WatchEventKind::Other);
    }

    #[test]
    fn watching_missing_directory_creates_it() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nested").join("fresh");

        let stream = NotifyWatcher::new().watch(&missing);

        assert!(stream.is_ok());
        assert!(missing.is_dir());
    }

    #[test]
    fn watching_below_a_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();

        let result = NotifyWatcher::new().watch(&blocker.join("sub"));
        assert!(matches!(result, Err(WatchError::CreateDirectory { .. })));
    }
}
