//! In-process storage and notification backend.

use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{
    BackendError, ChangeNotifier, StorageBackend, WatchError, WatchEvent, WatchEventKind,
    WatchStream,
};

/// A subscriber registered through [`ChangeNotifier::watch`].
#[derive(Debug)]
struct Subscriber {
    tx: mpsc::UnboundedSender<WatchEvent>,
    suspended: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<String, Vec<u8>>,
    subscribers: Vec<Subscriber>,
    writes: usize,
    fail_writes: bool,
    fail_watch: bool,
    ignore_suspension: bool,
}

impl Inner {
    fn notify(&mut self, kind: WatchEventKind, name: &str) {
        let ignore_suspension = self.ignore_suspension;
        self.subscribers.retain(|subscriber| {
            if !ignore_suspension && subscriber.suspended.load(Ordering::SeqCst) {
                return !subscriber.tx.is_closed();
            }
            subscriber.tx.send(WatchEvent::new(kind, name)).is_ok()
        });
    }
}

/// In-memory implementation of both [`StorageBackend`] and [`ChangeNotifier`].
///
/// Every write, through the store or from a test acting as "another process",
/// is broadcast to all live subscriptions, the same way an OS watcher would
/// report it. Clones share the same files and subscribers.
///
/// Failure injection ([`set_fail_writes`](Self::set_fail_writes),
/// [`set_fail_watch`](Self::set_fail_watch)) allows exercising error paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current contents of `name`, if present.
    #[must_use]
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().files.get(name).cloned()
    }

    /// Stores `bytes` under `name` without notifying subscribers or
    /// counting a write. Useful for seeding state before `init`.
    pub fn seed(&self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.lock().files.insert(name.into(), bytes.into());
    }

    /// Removes `name`, notifying subscribers with [`WatchEventKind::Removed`].
    pub fn remove(&self, name: &str) {
        let mut inner = self.lock();
        if inner.files.remove(name).is_some() {
            inner.notify(WatchEventKind::Removed, name);
        }
    }

    /// Emits a [`WatchEventKind::Modified`] notification for `name`
    /// without changing its contents.
    pub fn touch(&self, name: &str) {
        self.lock().notify(WatchEventKind::Modified, name);
    }

    /// Number of successful [`StorageBackend::write_file`] calls so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Makes subsequent writes fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Makes subsequent [`ChangeNotifier::watch`] calls fail.
    pub fn set_fail_watch(&self, fail: bool) {
        self.lock().fail_watch = fail;
    }

    /// Delivers notifications even to suspended subscriptions, the way a
    /// slow OS watcher may report a write after the subscription resumed.
    pub fn set_ignore_suspension(&self, ignore: bool) {
        self.lock().ignore_suspension = ignore;
    }
}

impl StorageBackend for MemoryBackend {
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, BackendError> {
        self.lock()
            .files
            .get(name)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), BackendError> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(BackendError::Io(io::Error::other("injected write failure")));
        }

        let existed = inner.files.insert(name.to_owned(), bytes.to_vec()).is_some();
        inner.writes += 1;

        if !existed {
            inner.notify(WatchEventKind::Created, name);
        }
        inner.notify(WatchEventKind::Modified, name);
        Ok(())
    }
}

impl ChangeNotifier for MemoryBackend {
    type Stream = MemoryWatchStream;

    fn watch(&self, _directory: &Path) -> Result<Self::Stream, WatchError> {
        let mut inner = self.lock();
        if inner.fail_watch {
            return Err(WatchError::Backend {
                message: "injected watch failure".to_string(),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let suspended = Arc::new(AtomicBool::new(false));
        inner.subscribers.push(Subscriber {
            tx,
            suspended: Arc::clone(&suspended),
        });

        Ok(MemoryWatchStream {
            events: UnboundedReceiverStream::new(rx),
            suspended,
        })
    }
}

/// Subscription returned by [`MemoryBackend`]'s [`ChangeNotifier`] impl.
#[derive(Debug)]
pub struct MemoryWatchStream {
    events: UnboundedReceiverStream<WatchEvent>,
    suspended: Arc<AtomicBool>,
}

impl Stream for MemoryWatchStream {
    type Item = WatchEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl WatchStream for MemoryWatchStream {
    fn suspend(&self) {
        self.suspended.store(true, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.suspended.store(false, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.events.close();
    }
}
