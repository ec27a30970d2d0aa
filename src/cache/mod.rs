//! Cache Module
//!
//! Two-layer caching: a bounded process-local store (L1) in front of a
//! shared remote store (L2), coordinated by [`CacheCoordinator`].

pub mod codec;
mod cacheable;
mod coordinator;
mod entry;
mod local;
mod lru;
mod options;
mod pattern;
pub mod remote;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use cacheable::{CacheEvict, Cacheable, KeyTemplate};
pub use coordinator::{CacheCoordinator, Lookup, SCAN_BATCH_SIZE};
pub use entry::CacheEntry;
pub use local::{LocalStore, LocalStoreStats};
pub use lru::LruTracker;
pub use options::{CacheLayer, CacheOptions, Ttl};
pub use pattern::GlobPattern;
pub use remote::{BatchWrite, MemoryRemoteStore, RedisStore, RemoteStore};
pub use stats::{CacheStats, L1Report, L2Report, StatsReport, TotalReport};
