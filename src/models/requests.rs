//! Request DTOs for the cache admin API
//!
//! Query-string parameters of the admin endpoints.

use serde::Deserialize;

use crate::error::{CacheError, Result};

/// Query for endpoints addressing a single key (`?key=...`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyQuery {
    #[serde(default)]
    pub key: Option<String>,
}

impl KeyQuery {
    /// Returns the key, or an error if it is missing or empty.
    pub fn require(self) -> Result<String> {
        require_param(self.key, "Key parameter is required")
    }
}

/// Query for pattern deletion (`?pattern=...`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatternQuery {
    #[serde(default)]
    pub pattern: Option<String>,
}

impl PatternQuery {
    /// Returns the pattern, or an error if it is missing or empty.
    pub fn require(self) -> Result<String> {
        require_param(self.pattern, "Pattern parameter is required")
    }
}

fn require_param(value: Option<String>, message: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(CacheError::InvalidRequest(message.to_string())),
    }
}
