//! Serialization Codec
//!
//! JSON encoding of cached values plus the absence sentinel. The sentinel is
//! not valid JSON, so it can never collide with an encoded payload.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// Stored in place of a value to record "computed, and nothing was there".
pub const NULL_SENTINEL: &str = "__NULL__";

/// Encodes a value for storage. Anything that serializes to JSON `null`
/// (`None`, `()`, `Value::Null`) is stored as the sentinel.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    if json == "null" {
        Ok(NULL_SENTINEL.to_string())
    } else {
        Ok(json)
    }
}

/// Decodes a stored string; the sentinel decodes to `None`.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<Option<T>> {
    if is_sentinel(raw) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(raw)?))
}

pub fn is_sentinel(raw: &str) -> bool {
    raw == NULL_SENTINEL
}

/// True if the value would be stored as the sentinel.
pub fn is_null<T: Serialize + ?Sized>(value: &T) -> bool {
    serde_json::to_value(value).is_ok_and(|json| json.is_null())
}
