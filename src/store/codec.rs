//! Serialization of the in-memory document to and from bytes.
//!
//! The persisted layout is exactly one UTF-8 JSON object. Keys are emitted
//! in sorted order (`serde_json::Map` is a `BTreeMap`), so encoding the same
//! document always yields the same bytes and the same [`Digest`](super::Digest).

use serde_json::Value;
use thiserror::Error;

use super::ConfigData;

/// Reason a persisted document could not be decoded.
#[derive(Debug, Error)]
pub enum CorruptConfig {
    /// The bytes are not valid JSON.
    #[error("Invalid JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    /// The bytes are valid JSON, but not an object.
    #[error("Expected a JSON object, found {found}")]
    NotAnObject {
        /// JSON type that was found instead
        found: &'static str,
    },
}

/// Serializes `data` to compact JSON.
///
/// # Errors
///
/// Returns an error if a value cannot be represented as JSON.
pub fn encode(data: &ConfigData) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(data)
}

/// Parses bytes produced by [`encode`] (or written by another process).
///
/// # Errors
///
/// Returns [`CorruptConfig`] on malformed input. Malformed input is never
/// treated as an empty document.
pub fn decode(bytes: &[u8]) -> Result<ConfigData, CorruptConfig> {
    match serde_json::from_slice::<Value>(bytes).map_err(CorruptConfig::Syntax)? {
        Value::Object(map) => Ok(map),
        other => Err(CorruptConfig::NotAnObject {
            found: json_type_name(&other),
        }),
    }
}

const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
