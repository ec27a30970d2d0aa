//! Cache Entry Module
//!
//! Defines the structure for individual L1 entries with TTL support.
//!
//! Time is measured with `tokio::time::Instant` so that a paused runtime
//! clock controls expiry in tests.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single L1 entry: the serialized value and its deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Serialized value (JSON text or the absence sentinel)
    pub value: String,
    /// Expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The serialized value to store
    /// * `ttl` - Optional lifetime; `None` never expires
    pub fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its deadline.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Expiry check against a caller-provided instant, used by sweeps that
    /// evaluate many entries against the same `now`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining lifetime, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }
}
