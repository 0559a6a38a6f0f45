//! Lifecycle of the change-notification subscription.

use tokio_stream::StreamExt;

use crate::backend::{WatchEvent, WatchStream};

/// Lifecycle state of a [`Subscription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatchState {
    /// Watching disabled, or not yet started.
    Unwatched,
    /// Events are being delivered.
    Watching,
    /// Temporarily muted around the store's own file access.
    Suspended,
    /// Permanently closed (`exit`, or the stream ended).
    Closed,
}

/// Owner of the optional watch stream.
///
/// `Unwatched -> Watching -> Suspended -> Watching -> ... -> Closed`
#[derive(Debug)]
pub(crate) struct Subscription<S> {
    stream: Option<S>,
    state: WatchState,
}

impl<S: WatchStream> Subscription<S> {
    pub(crate) const fn unwatched() -> Self {
        Self {
            stream: None,
            state: WatchState::Unwatched,
        }
    }

    pub(crate) fn watching(stream: S) -> Self {
        Self {
            stream: Some(stream),
            state: WatchState::Watching,
        }
    }

    #[cfg(test)]
    pub(crate) const fn state(&self) -> WatchState {
        self.state
    }

    /// Mutes the subscription until the returned guard is dropped.
    ///
    /// A no-op unless currently `Watching`; the guard then restores nothing.
    pub(crate) fn suspend(&mut self) -> SuspendGuard<'_, S> {
        let active = self.state == WatchState::Watching;
        if active {
            if let Some(stream) = &self.stream {
                stream.suspend();
            }
            self.state = WatchState::Suspended;
        }
        SuspendGuard {
            subscription: self,
            active,
        }
    }

    /// Waits for the next event while `Watching`; pends forever otherwise.
    ///
    /// Returns `None` once the underlying stream has ended.
    pub(crate) async fn next_event(&mut self) -> Option<WatchEvent> {
        match (&mut self.stream, self.state) {
            (Some(stream), WatchState::Watching) => stream.next().await,
            _ => std::future::pending().await,
        }
    }

    /// Permanently stops the stream.
    pub(crate) fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
        self.state = WatchState::Closed;
    }
}

/// Restores a suspended [`Subscription`] on drop, on every exit path.
#[derive(Debug)]
pub(crate) struct SuspendGuard<'a, S: WatchStream> {
    subscription: &'a mut Subscription<S>,
    active: bool,
}

impl<S: WatchStream> Drop for SuspendGuard<'_, S> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Some(stream) = &self.subscription.stream {
            stream.resume();
        }
        self.subscription.state = WatchState::Watching;
    }
}
