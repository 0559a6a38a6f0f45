//! Write-back and reconciliation engine.
//!
//! One engine task runs per store. It owns everything that must not be
//! touched concurrently: the last known on-disk digest, the debounce timer
//! and the watch subscription. User commands, timer expiry and change
//! notifications are all handled by the same `select!` loop, so a flush and
//! a reconciliation can never interleave.

use std::ops::ControlFlow;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{broadcast, mpsc, oneshot};

use super::codec;
use super::data::Store;
use super::fingerprint::Digest;
use super::scheduler::Debouncer;
use super::subscription::Subscription;
use super::{ConfigData, StoreError, StoreEvent, StoreOptions};
use crate::backend::{BackendError, StorageBackend, WatchEvent, WatchStream};

/// State shared between the public handle and the engine task.
#[derive(Debug)]
pub(crate) struct Shared {
    store: RwLock<Store>,
    events: broadcast::Sender<StoreEvent>,
}

impl Shared {
    pub(crate) fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity);
        Self {
            store: RwLock::new(Store::default()),
            events,
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: StoreEvent) {
        // No receivers is not an error
        let _ = self.events.send(event);
    }
}

/// Reply channel for commands that report a result.
pub(crate) type Reply = oneshot::Sender<Result<(), StoreError>>;

/// Requests sent from the public handle to the engine task.
#[derive(Debug)]
pub(crate) enum Command {
    /// A mutation happened; (re)arm the debounce timer.
    Schedule,
    /// Flush now, reporting the result.
    Flush(Reply),
    /// Close the subscription, flush, and stop.
    Shutdown(Reply),
}

pub(crate) struct Engine<B, S> {
    shared: Arc<Shared>,
    backend: Arc<B>,
    filename: String,
    debouncer: Debouncer,
    subscription: Subscription<S>,
    /// Digest of the last contents written or successfully read.
    last_digest: Option<Digest>,
    /// The file was found corrupt or missing after `last_digest` was
    /// recorded, so a flush must write even if the digests match.
    disk_diverged: bool,
}

impl<B, S> Engine<B, S>
where
    B: StorageBackend,
    S: WatchStream,
{
    pub(crate) fn new(shared: Arc<Shared>, backend: Arc<B>, options: &StoreOptions) -> Self {
        Self {
            shared,
            backend,
            filename: options.filename().to_string(),
            debouncer: Debouncer::new(options.debounce()),
            subscription: Subscription::unwatched(),
            last_digest: None,
            disk_diverged: false,
        }
    }

    /// Starts delivering change notifications from `stream`.
    pub(crate) fn attach(&mut self, stream: S) {
        self.subscription = Subscription::watching(stream);
    }

    /// Initial read: installs the file contents, or an empty document if
    /// the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] or [`StoreError::Corrupt`]; the in-memory
    /// document is left untouched in both cases.
    pub(crate) async fn load(&mut self) -> Result<(), StoreError> {
        let bytes = match self.backend.read_file(&self.filename).await {
            Ok(bytes) => bytes,
            Err(BackendError::NotFound) => {
                tracing::info!("No options file '{}' yet, starting empty", self.filename);
                self.shared.write().load(ConfigData::new());
                self.last_digest = None;
                return Ok(());
            }
            Err(BackendError::Io(source)) => return Err(self.read_error(source)),
        };

        let data = self.decode(&bytes)?;
        let digest = Digest::of(&bytes);
        tracing::debug!("Loaded {} key(s) from '{}' ({digest:?})", data.len(), self.filename);

        self.shared.write().load(data);
        self.last_digest = Some(digest);
        Ok(())
    }

    /// Runs until shutdown is requested or the handle is dropped.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                biased;

                command = commands.recv() => {
                    let Some(command) = command else {
                        // Handle dropped without exit: same shutdown, nobody to report to
                        if let Err(e) = self.shutdown().await {
                            tracing::error!("Final write failed: {e}");
                        }
                        break;
                    };
                    if self.handle_command(command).await.is_break() {
                        break;
                    }
                }

                () = self.debouncer.expired() => {
                    self.flush_in_background().await;
                }

                event = self.subscription.next_event() => {
                    self.handle_watch_event(event).await;
                }
            }
        }

        tracing::debug!("Store engine for '{}' stopped", self.filename);
    }

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Schedule => self.debouncer.arm(),
            Command::Flush(reply) => {
                self.debouncer.take_pending();
                let result = self.flush().await;
                // Caller may have given up waiting
                let _ = reply.send(result);
            }
            Command::Shutdown(reply) => {
                let _ = reply.send(self.shutdown().await);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn shutdown(&mut self) -> Result<(), StoreError> {
        self.debouncer.cancel();
        self.subscription.close();
        self.flush().await
    }

    /// Writes the document if it changed since the last known file contents.
    ///
    /// On failure the dirty flag stays set, so the next scheduled or forced
    /// flush retries.
    async fn flush(&mut self) -> Result<(), StoreError> {
        let (bytes, generation) = {
            let store = self.shared.read();
            if !store.is_dirty() {
                return Ok(());
            }
            let bytes = codec::encode(store.data()).map_err(StoreError::Encode)?;
            (bytes, store.generation())
        };

        let digest = Digest::of(&bytes);
        if self.last_digest == Some(digest) && !self.disk_diverged {
            tracing::debug!("Contents unchanged ({digest:?}), skipping write");
            self.shared.write().mark_clean(generation);
            return Ok(());
        }

        let written = {
            let _suspended = self.subscription.suspend();
            self.backend.write_file(&self.filename, &bytes).await
        };

        match written {
            Ok(()) => {
                self.last_digest = Some(digest);
                self.disk_diverged = false;
                if !self.shared.write().mark_clean(generation) {
                    tracing::debug!("Mutated during write, staying dirty");
                }
                tracing::debug!("Wrote {} bytes to '{}' ({digest:?})", bytes.len(), self.filename);
                Ok(())
            }
            Err(e) => Err(StoreError::Write {
                name: self.filename.clone(),
                source: e.into_io(),
            }),
        }
    }

    async fn flush_in_background(&mut self) {
        if let Err(e) = self.flush().await {
            tracing::error!("Scheduled write failed: {e}");
            self.shared.publish(StoreEvent::Error(Arc::new(e)));
        }
    }

    async fn handle_watch_event(&mut self, event: Option<WatchEvent>) {
        let Some(event) = event else {
            tracing::warn!("Change notifications ended, external edits will not be picked up");
            self.subscription.close();
            return;
        };

        if !event.is_content_change_of(&self.filename) {
            tracing::trace!("Ignoring {:?} event for '{}'", event.kind, event.name);
            return;
        }

        match self.reconcile().await {
            Ok(Some((old, new))) => self.shared.publish(StoreEvent::Changed { old, new }),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Failed to apply external change: {e}");
                self.shared.publish(StoreEvent::Error(Arc::new(e)));
            }
        }
    }

    /// Re-reads the file after a change notification.
    ///
    /// Returns the `(old, new)` documents if the contents really changed.
    /// A vanished file or identical contents are not a change; corrupt
    /// contents are an error and leave the in-memory document alone.
    /// Neither a vanished file nor corrupt contents replace `last_digest`;
    /// they mark the file as diverged so the next flush rewrites it.
    /// External contents replace unflushed local mutations.
    async fn reconcile(&mut self) -> Result<Option<(ConfigData, ConfigData)>, StoreError> {
        let read = {
            let _suspended = self.subscription.suspend();
            self.backend.read_file(&self.filename).await
        };

        let bytes = match read {
            Ok(bytes) => bytes,
            Err(BackendError::NotFound) => {
                tracing::debug!("'{}' missing after notification, ignoring", self.filename);
                self.disk_diverged = true;
                return Ok(None);
            }
            Err(BackendError::Io(source)) => return Err(self.read_error(source)),
        };

        let digest = Digest::of(&bytes);
        if self.last_digest == Some(digest) {
            tracing::debug!("Notification without content change ({digest:?})");
            // Last good contents are back in place
            self.disk_diverged = false;
            return Ok(None);
        }

        let new = match self.decode(&bytes) {
            Ok(new) => new,
            Err(e) => {
                self.disk_diverged = true;
                return Err(e);
            }
        };
        let old = self.shared.write().load(new.clone());
        self.last_digest = Some(digest);
        self.disk_diverged = false;

        tracing::info!("Applied external change to '{}'", self.filename);
        Ok(Some((old, new)))
    }

    fn decode(&self, bytes: &[u8]) -> Result<ConfigData, StoreError> {
        codec::decode(bytes).map_err(|source| StoreError::Corrupt {
            name: self.filename.clone(),
            source,
        })
    }

    fn read_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Read {
            name: self.filename.clone(),
            source,
        }
    }
}
