//! Notifications published by a running store.

use std::sync::Arc;

use super::{ConfigData, StoreError};

/// Event delivered to [`ConfigStore::subscribe`](super::ConfigStore::subscribe) receivers.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// The options file was changed by someone else and the new contents
    /// were applied. Never emitted for the store's own writes.
    Changed {
        /// Document before the change was applied.
        old: ConfigData,
        /// Document after the change was applied.
        new: ConfigData,
    },

    /// A background operation failed: a timer-triggered flush, or a
    /// reconciliation read. The store keeps running.
    Error(Arc<StoreError>),
}

impl StoreEvent {
    /// Returns the `(old, new)` pair of a [`StoreEvent::Changed`] event.
    #[must_use]
    pub const fn as_change(&self) -> Option<(&ConfigData, &ConfigData)> {
        match self {
            Self::Changed { old, new } => Some((old, new)),
            Self::Error(_) => None,
        }
    }

    /// Returns the error of a [`StoreEvent::Error`] event.
    #[must_use]
    pub fn as_error(&self) -> Option<&StoreError> {
        match self {
            Self::Error(error) => Some(error),
            Self::Changed { .. } => None,
        }
    }
}
