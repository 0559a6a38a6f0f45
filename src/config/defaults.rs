//! Default values for command-line configuration.
//!
//! Store-level defaults live in [`crate::store::defaults`]; this module only
//! adds limits specific to the command-line front end.

pub use crate::store::defaults::{DEBOUNCE_MS, FILENAME, WATCH};

/// Largest accepted write-back delay in milliseconds (one hour).
pub const MAX_DEBOUNCE_MS: u64 = 60 * 60 * 1000;
