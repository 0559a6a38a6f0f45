//! Debounce timer for write-back.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};

/// Cancel-and-replace debounce timer.
///
/// At most one deadline is outstanding. Re-arming moves the deadline
/// instead of adding a second one, so any number of mutations within the
/// delay collapse into a single expiry.
///
/// # State Machine
///
/// | State | `arm` | `cancel` | delay elapses |
/// |-------|-------|----------|---------------|
/// | Idle | Armed | Idle | - |
/// | Armed | Armed (deadline moved) | Idle | Idle, [`expired`](Self::expired) resolves |
///
/// The timer has no task of its own: the owner awaits [`expired`](Self::expired)
/// from its event loop, which keeps expiry on the same serialization point as
/// every other state transition.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    /// Creates an idle debouncer with the given delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Returns the configured delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns true if a deadline is pending.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Arms the timer, replacing any pending deadline.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    /// Drops the pending deadline. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Takes over the pending deadline: the timer is left idle and the
    /// caller performs the flush itself instead of waiting for expiry.
    ///
    /// Returns whether a deadline was pending. Nothing is fired by the
    /// debouncer; `expired` simply stops resolving for this deadline.
    pub fn take_pending(&mut self) -> bool {
        self.cancel()
    }

    /// Resolves when the pending deadline passes, leaving the timer idle.
    ///
    /// Never resolves while idle. Cancel-safe: dropping the future before
    /// it resolves leaves the deadline in place.
    pub async fn expired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}
