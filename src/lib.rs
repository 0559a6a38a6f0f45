//! optstore: persistent JSON options store
//!
//! A key-value store backed by a single JSON file. Mutations apply in memory
//! immediately and are written back after a debounce delay; edits made to
//! the file by other processes are picked up and published as change events.

pub mod backend;
pub mod config;
pub mod store;

pub use store::{ConfigData, ConfigStore, StoreError, StoreEvent, StoreOptions};
