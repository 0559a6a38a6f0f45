//! Persistent JSON options store.
//!
//! This module provides:
//! - The public handle ([`ConfigStore`]) with get/set/delete/replace
//! - Construction options ([`StoreOptions`]) and [`defaults`]
//! - Change and error notifications ([`StoreEvent`])
//! - Errors ([`StoreError`], [`CorruptConfig`])
//! - Serialization ([`codec`]) and content fingerprints ([`Digest`])
//! - The debounce timer used for write-back ([`Debouncer`])
//!
//! # Lifecycle
//!
//! 1. [`ConfigStore::new`] validates options; no I/O happens yet.
//! 2. [`ConfigStore::init`] subscribes to change notifications (if enabled),
//!    reads the file and starts the background engine.
//! 3. Mutations update memory immediately and schedule a debounced write.
//!    External edits to the file are re-read and published as
//!    [`StoreEvent::Changed`].
//! 4. [`ConfigStore::exit`] closes the subscription and performs a final write.
//!
//! # Consistency
//!
//! A write is skipped when the encoded document hashes to the same [`Digest`]
//! as the last known file contents, and a change notification is ignored when
//! the re-read file hashes to that digest. Together with suspending the
//! subscription around the store's own reads and writes, this keeps the store
//! from reacting to its own writes.
//!
//! When an external edit arrives while local mutations are still waiting for
//! their debounced write, the external contents win.

pub mod codec;
mod data;
pub mod defaults;
mod engine;
mod error;
mod event;
mod fingerprint;
mod options;
mod scheduler;
mod subscription;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

pub use codec::CorruptConfig;
pub use error::StoreError;
pub use event::StoreEvent;
pub use fingerprint::Digest;
pub use options::StoreOptions;
pub use scheduler::Debouncer;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::backend::{ChangeNotifier, FsBackend, MemoryBackend, NotifyWatcher, StorageBackend};
use engine::{Command, Engine, Reply, Shared};

/// The document held by a store: string keys to arbitrary JSON values.
pub type ConfigData = serde_json::Map<String, Value>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a persistent options store.
///
/// Reads and mutations are synchronous and operate on memory; persistence
/// and reconciliation happen on a background task started by
/// [`init`](Self::init). The handle is `Send + Sync` and can be shared
/// behind an `Arc`.
///
/// # Type Parameters
///
/// * `B` - The [`StorageBackend`] holding the options file
/// * `N` - The [`ChangeNotifier`] reporting external edits
///
/// # Example
///
/// ```ignore
/// use optstore::{ConfigStore, StoreOptions};
///
/// let store = ConfigStore::on_disk(StoreOptions::new("/var/lib/app"))?;
/// store.init().await?;
///
/// let previous = store.set("theme", "dark");
/// assert_eq!(store.get("theme"), Some("dark".into()));
///
/// store.exit().await?;
/// ```
pub struct ConfigStore<B = FsBackend, N = NotifyWatcher> {
    options: StoreOptions,
    shared: Arc<Shared>,
    backend: Arc<B>,
    notifier: N,
    commands: mpsc::UnboundedSender<Command>,
    /// Receiving end of `commands`, held until `init` hands it to the engine.
    pending: Mutex<Option<mpsc::UnboundedReceiver<Command>>>,
    engine: Mutex<Option<JoinHandle<()>>>,
}

impl<B, N> std::fmt::Debug for ConfigStore<B, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("options", &self.options)
            .field("running", &lock(&self.engine).is_some())
            .finish_non_exhaustive()
    }
}

impl ConfigStore<FsBackend, NotifyWatcher> {
    /// Creates a store for a directory on the local filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingDirectory`] if no directory is set.
    pub fn on_disk(options: StoreOptions) -> Result<Self, StoreError> {
        let backend = FsBackend::new(options.directory());
        Self::new(options, backend, NotifyWatcher::new())
    }
}

impl ConfigStore<MemoryBackend, MemoryBackend> {
    /// Creates a store whose file lives in `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingDirectory`] if no directory is set.
    pub fn in_memory(options: StoreOptions, backend: MemoryBackend) -> Result<Self, StoreError> {
        let notifier = backend.clone();
        Self::new(options, backend, notifier)
    }
}

impl<B, N> ConfigStore<B, N>
where
    B: StorageBackend,
    N: ChangeNotifier,
{
    /// Creates a store over the given backends.
    ///
    /// No I/O is performed; call [`init`](Self::init) to load the file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingDirectory`] if no directory is set.
    pub fn new(options: StoreOptions, backend: B, notifier: N) -> Result<Self, StoreError> {
        if options.directory().as_os_str().is_empty() {
            return Err(StoreError::MissingDirectory);
        }

        let (commands, pending) = mpsc::unbounded_channel();

        Ok(Self {
            options,
            shared: Arc::new(Shared::new(defaults::EVENT_CAPACITY)),
            backend: Arc::new(backend),
            notifier,
            commands,
            pending: Mutex::new(Some(pending)),
            engine: Mutex::new(None),
        })
    }

    /// Returns the options this store was created with.
    #[must_use]
    pub const fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Loads the options file and starts background persistence.
    ///
    /// A missing file is not an error: the store starts empty. Whatever was
    /// set in memory before `init` is replaced by the file contents. If
    /// watching is enabled, the subscription is established before the
    /// read, so an edit racing with `init` is still picked up.
    ///
    /// Must be called from within a Tokio runtime. A failed `init` can be
    /// retried.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Corrupt`] if the file is not a JSON object
    /// - [`StoreError::Read`] if the file cannot be read
    /// - [`StoreError::Watch`] if the subscription cannot be established
    /// - [`StoreError::AlreadyInitialized`] on a second call
    pub async fn init(&self) -> Result<(), StoreError> {
        let commands = lock(&self.pending)
            .take()
            .ok_or(StoreError::AlreadyInitialized)?;

        let mut engine = Engine::new(
            Arc::clone(&self.shared),
            Arc::clone(&self.backend),
            &self.options,
        );

        if let Err(e) = self.prepare(&mut engine).await {
            *lock(&self.pending) = Some(commands);
            return Err(e);
        }

        let handle = tokio::spawn(engine.run(commands));
        *lock(&self.engine) = Some(handle);

        tracing::info!("Options store ready: {}", self.options);
        Ok(())
    }

    async fn prepare(&self, engine: &mut Engine<B, N::Stream>) -> Result<(), StoreError> {
        if self.options.watch() {
            let stream = self.notifier.watch(self.options.directory())?;
            engine.attach(stream);
        }
        engine.load().await
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.shared.read().get(key).cloned()
    }

    /// Returns the value stored under `key`, or `default` if absent.
    #[must_use]
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Returns true if `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.shared.read().contains_key(key)
    }

    /// Returns a copy of the whole document.
    #[must_use]
    pub fn snapshot(&self) -> ConfigData {
        self.shared.read().data().clone()
    }

    /// Returns true if there are mutations not yet written.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.shared.read().is_dirty()
    }

    /// Stores `value` under `key` and schedules a write.
    ///
    /// Returns the previous value, if any.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let previous = self.shared.write().set(key.into(), value.into());
        self.schedule();
        previous
    }

    /// Removes `key` and schedules a write.
    ///
    /// Returns the removed value. Removing an absent key does nothing.
    pub fn delete(&self, key: &str) -> Option<Value> {
        let previous = self.shared.write().delete(key)?;
        self.schedule();
        Some(previous)
    }

    /// Replaces the whole document and schedules a write.
    ///
    /// Returns the previous document.
    pub fn replace(&self, data: ConfigData) -> ConfigData {
        let previous = self.shared.write().replace(data);
        self.schedule();
        previous
    }

    /// Subscribes to change and error notifications.
    ///
    /// Only events published after this call are received.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.shared.subscribe()
    }

    /// Writes pending mutations now instead of waiting for the debounce delay.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Write`] if the write fails; the mutations stay pending
    /// - [`StoreError::NotRunning`] before `init` or after `exit`
    pub async fn flush(&self) -> Result<(), StoreError> {
        if lock(&self.engine).is_none() {
            return Err(StoreError::NotRunning);
        }
        self.request(Command::Flush).await
    }

    /// Stops watching, writes pending mutations and stops the engine.
    ///
    /// No scheduled write fires after `exit` begins. Mutations made after
    /// `exit` stay in memory only.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Write`] if the final write fails
    /// - [`StoreError::NotRunning`] before `init` or on a second call
    pub async fn exit(&self) -> Result<(), StoreError> {
        let handle = lock(&self.engine).take().ok_or(StoreError::NotRunning)?;
        let result = self.request(Command::Shutdown).await;

        if let Err(e) = handle.await {
            tracing::error!("Options store engine failed: {e}");
        }

        tracing::info!("Options store closed: {}", self.options.path().display());
        result
    }

    fn schedule(&self) {
        if self.commands.send(Command::Schedule).is_err() {
            tracing::debug!("Options store not running, change kept in memory only");
        }
    }

    async fn request(&self, command: fn(Reply) -> Command) -> Result<(), StoreError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .map_err(|_| StoreError::NotRunning)?;
        response.await.map_err(|_| StoreError::NotRunning)?
    }
}
