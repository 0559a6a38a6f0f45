//! Default values for store options.

use std::time::Duration;

/// Default name of the options file inside the store directory.
pub const FILENAME: &str = "options.json";

/// Default debounce delay in milliseconds.
///
/// Zero still coalesces mutations issued back-to-back without yielding.
pub const DEBOUNCE_MS: u64 = 0;

/// Whether external changes are watched by default.
pub const WATCH: bool = true;

/// Capacity of the [`StoreEvent`](super::StoreEvent) broadcast channel.
///
/// Subscribers that fall further behind than this miss events.
pub const EVENT_CAPACITY: usize = 64;

/// Default debounce delay as Duration.
#[must_use]
pub const fn debounce() -> Duration {
    Duration::from_millis(DEBOUNCE_MS)
}
