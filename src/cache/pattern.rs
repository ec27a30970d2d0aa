//! Glob patterns for bulk invalidation.
//!
//! `*` matches any run of characters and `?` exactly one; everything else is
//! literal. The raw glob is kept for server-side SCAN filtering while the
//! anchored regex filters local keys.

use regex::Regex;

use crate::error::{CacheError, Result};

#[derive(Debug, Clone)]
pub struct GlobPattern {
    glob: String,
    regex: Regex,
}

impl GlobPattern {
    pub fn new(glob: &str) -> Result<Self> {
        if glob.is_empty() {
            return Err(CacheError::InvalidRequest(
                "Pattern cannot be empty".to_string(),
            ));
        }

        let mut source = String::with_capacity(glob.len() + 8);
        source.push('^');
        for ch in glob.chars() {
            match ch {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');

        Ok(Self {
            glob: glob.to_string(),
            regex: Regex::new(&source)?,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The pattern as written, suitable for `SCAN ... MATCH`.
    pub fn as_glob(&self) -> &str {
        &self.glob
    }
}
