//! Application execution logic.
//!
//! Opens the options store described by the configuration, runs one
//! command against it and closes it again.

use std::future::Future;
use std::io::{self, Write};

use serde_json::Value;
use thiserror::Error;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;

use optstore::backend::{ChangeNotifier, StorageBackend};
use optstore::config::{Command, ValidatedConfig};
use optstore::{ConfigStore, StoreError, StoreEvent};

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// The options store reported an error.
    #[error("Options store error: {0}")]
    Store(#[from] StoreError),

    /// The requested key is not present.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Failed to encode a value for output.
    #[error("Failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),

    /// Failed to write to standard output.
    #[error("Failed to write output: {0}")]
    Output(#[source] io::Error),

    /// The change event stream ended while watching.
    #[error("Change event stream terminated unexpectedly")]
    StreamTerminated,
}

/// Executes a single command against the configured options file.
///
/// Only `watch` subscribes to file changes; the other commands finish
/// before an external edit could matter. The store is always closed, so
/// mutations are written even if printing the result failed.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, loaded or written, or
/// if the command itself fails.
#[cfg(not(tarpaulin_include))]
pub async fn execute(config: ValidatedConfig, command: Command) -> Result<(), RunError> {
    let follow = command == Command::Watch;
    let options = config.store_options().with_watch(follow);

    let store = ConfigStore::on_disk(options)?;
    store.init().await?;

    let outcome = run_command(&store, command, &mut io::stdout(), shutdown_signal()).await;
    let closed = store.exit().await;

    outcome?;
    closed?;
    Ok(())
}

/// Runs `command` against an initialized store, printing results to `out`.
///
/// `shutdown` ends the `watch` command; other commands ignore it.
async fn run_command<B, N, W>(
    store: &ConfigStore<B, N>,
    command: Command,
    out: &mut W,
    shutdown: impl Future<Output = ()>,
) -> Result<(), RunError>
where
    B: StorageBackend,
    N: ChangeNotifier,
    W: Write,
{
    match command {
        Command::Get { key } => {
            let value = store.get(&key).ok_or(RunError::KeyNotFound(key))?;
            print_json(out, &value)
        }
        Command::Set { key, value } => {
            let value = parse_value(&value);
            match store.set(key.clone(), value) {
                Some(previous) => tracing::info!("Updated '{key}' (was {previous})"),
                None => tracing::info!("Added '{key}'"),
            }
            Ok(())
        }
        Command::Delete { key } => {
            match store.delete(&key) {
                Some(previous) => tracing::info!("Deleted '{key}' (was {previous})"),
                None => tracing::warn!("Key '{key}' not present, nothing to delete"),
            }
            Ok(())
        }
        Command::Dump => print_json(out, &Value::Object(store.snapshot())),
        Command::Watch => follow_changes(store, out, shutdown).await,
        // Handled before the store is opened
        Command::InitConfig { .. } => Ok(()),
    }
}

/// Prints each external change as one JSON line until `shutdown` completes.
async fn follow_changes<B, N, W>(
    store: &ConfigStore<B, N>,
    out: &mut W,
    shutdown: impl Future<Output = ()>,
) -> Result<(), RunError>
where
    B: StorageBackend,
    N: ChangeNotifier,
    W: Write,
{
    let mut events = store.subscribe();
    tokio::pin!(shutdown);

    tracing::info!(
        "Watching {} for changes, press Ctrl+C to stop",
        store.options().path().display()
    );

    loop {
        tokio::select! {
            biased;

            () = &mut shutdown => {
                tracing::info!("Shutdown signal received, stopping...");
                return Ok(());
            }

            event = events.recv() => match event {
                Ok(StoreEvent::Changed { old, new }) => {
                    let line = serde_json::json!({ "old": old, "new": new });
                    writeln!(out, "{line}").map_err(RunError::Output)?;
                    out.flush().map_err(RunError::Output)?;
                }
                Ok(StoreEvent::Error(e)) => tracing::warn!("External change not applied: {e}"),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Missed {missed} change event(s)");
                }
                Err(RecvError::Closed) => return Err(RunError::StreamTerminated),
            }
        }
    }
}

/// Interprets a command-line value as JSON, falling back to a plain string.
///
/// `12` becomes a number and `"12"` a string, while `dark` (not valid
/// JSON) is stored as the string `"dark"`.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn print_json<W: Write>(out: &mut W, value: &Value) -> Result<(), RunError> {
    let text = serde_json::to_string_pretty(value)?;
    writeln!(out, "{text}").map_err(RunError::Output)
}

/// Returns a future that completes when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
