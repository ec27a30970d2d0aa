//! Local Store Module
//!
//! The L1 layer: a bounded, process-local map of serialized values with
//! per-key TTL, LRU eviction at capacity and a sweep for expired entries.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{CacheEntry, LruTracker};

/// Counters describing the local layer itself (not lookups).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalStoreStats {
    pub keys: usize,
    pub evictions: u64,
    pub expirations: u64,
}

// == Local Store ==
/// Process-local key → serialized value store.
///
/// Reads of expired keys behave like absent keys; they never fail.
#[derive(Debug)]
pub struct LocalStore {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    max_keys: usize,
    std_ttl: Duration,
    evictions: u64,
    expirations: u64,
}

impl LocalStore {
    // == Constructor ==
    /// Creates a store holding at most `max_keys` entries.
    ///
    /// # Arguments
    /// * `max_keys` - Capacity; inserting a new key at capacity evicts the LRU key
    /// * `std_ttl_secs` - Default lifetime for entries written without a TTL
    pub fn new(max_keys: usize, std_ttl_secs: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            max_keys,
            std_ttl: Duration::from_secs(std_ttl_secs),
            evictions: 0,
            expirations: 0,
        }
    }

    /// Default lifetime for entries.
    pub fn std_ttl(&self) -> Duration {
        self.std_ttl
    }

    // == Get ==
    /// Returns the stored value if present and not expired.
    ///
    /// An expired entry is dropped on the spot.
    pub fn get(&mut self, key: &str) -> Option<String> {
        let expired = self.entries.get(key)?.is_expired();
        if expired {
            self.remove_expired(key);
            return None;
        }

        self.lru.touch(key);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Set ==
    /// Stores a value with an explicit lifetime (`None` = never expires).
    ///
    /// Overwrites reset the lifetime. A new key at capacity evicts the
    /// least recently used entry first.
    pub fn set(&mut self, key: &str, value: String, ttl: Option<Duration>) {
        if self.max_keys == 0 {
            return;
        }

        if !self.entries.contains_key(key) && self.entries.len() >= self.max_keys {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.evictions += 1;
            }
        }

        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        self.lru.touch(key);
    }

    /// Stores a value with the store's default lifetime.
    pub fn set_default(&mut self, key: &str, value: String) {
        let ttl = self.std_ttl;
        self.set(key, value, Some(ttl));
    }

    // == Delete ==
    /// Removes a key; returns whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.entries.remove(key).is_some()
    }

    /// Returns true if the key is present and not expired.
    pub fn contains(&mut self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.remove_expired(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Lists every live key.
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Remaining lifetime of a live key; `Some(None)` for a key that never expires.
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(CacheEntry::ttl_remaining)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries; returns the number removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_expired(key);
        }

        expired_keys.len()
    }

    pub fn stats(&self) -> LocalStoreStats {
        LocalStoreStats {
            keys: self.entries.len(),
            evictions: self.evictions,
            expirations: self.expirations,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn remove_expired(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            self.expirations += 1;
        }
    }
}
