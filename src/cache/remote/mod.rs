//! Remote Store Module
//!
//! The L2 layer is any shared key → string store offering the small command
//! set below. Connectivity failures are reported as
//! [`CacheError::Unavailable`](crate::error::CacheError), distinct from a
//! missing key (`Ok(None)` / `Ok(false)`).

mod memory;
mod redis_store;

use async_trait::async_trait;

use crate::error::Result;

pub use self::memory::MemoryRemoteStore;
pub use self::redis_store::RedisStore;

/// Cursor value that starts a scan and signals that it is exhausted.
pub const SCAN_START: u64 = 0;

/// One write of a batched [`RemoteStore::mset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchWrite {
    pub key: String,
    pub value: String,
    /// `None` writes without expiry
    pub ttl_secs: Option<u64>,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// GET
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// SET without expiry
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// SETEX
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// MGET; one entry per requested key, in request order.
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// SET / SETEX for every write in a single pipelined round trip.
    async fn mset(&self, writes: &[BatchWrite]) -> Result<()>;

    /// DEL with any number of keys; returns how many existed.
    async fn del(&self, keys: &[String]) -> Result<u64>;

    /// EXISTS
    async fn exists(&self, key: &str) -> Result<bool>;

    /// SCAN cursor MATCH pattern COUNT count; returns the next cursor and a
    /// batch of matching keys. A returned cursor of [`SCAN_START`] ends the scan.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)>;

    /// FLUSHDB
    async fn flush_db(&self) -> Result<()>;
}
