//! Cache Coordinator
//!
//! Orchestrates reads and writes across the local (L1) and remote (L2)
//! layers. Every public operation is infallible from the caller's point of
//! view: store and serialization failures are logged here and degrade to a
//! miss, `false` or `0`, pushing load back to the system of record.
//!
//! Consistency is best effort. A `set` writes L1 before L2 and does not undo
//! the L1 write when L2 fails; a pattern delete that fails midway keeps the
//! batches it already removed. Concurrent `get_or_set` calls for the same
//! missing key each run their factory (no request coalescing).

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::remote::{BatchWrite, RemoteStore, SCAN_START};
use crate::cache::{
    codec, CacheLayer, CacheOptions, CacheStats, GlobPattern, LocalStore, StatsReport, Ttl,
};
use crate::config::{Config, StrategyConfig};
use crate::error::{CacheError, Result};
use crate::tasks::spawn_sweep_task;

/// Keys requested per SCAN round trip during pattern deletion.
pub const SCAN_BATCH_SIZE: usize = 100;

/// Outcome of a lookup, keeping "cached absence" apart from "not cached".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Hit(T),
    /// The key holds the absence sentinel
    Absent,
    Miss,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Absent | Lookup::Miss => None,
        }
    }
}

// == Cache Coordinator ==
/// Two-layer cache handle. Cheap to clone; clones share both layers and the
/// statistics.
#[derive(Clone)]
pub struct CacheCoordinator {
    local: Arc<RwLock<LocalStore>>,
    remote: Arc<dyn RemoteStore>,
    stats: Arc<Mutex<CacheStats>>,
    strategy: Arc<StrategyConfig>,
    default_ttl_secs: u64,
}

impl CacheCoordinator {
    pub fn new(local: LocalStore, remote: Arc<dyn RemoteStore>, strategy: StrategyConfig) -> Self {
        let default_ttl_secs = local.std_ttl().as_secs();
        Self {
            local: Arc::new(RwLock::new(local)),
            remote,
            stats: Arc::new(Mutex::new(CacheStats::new())),
            strategy: Arc::new(strategy),
            default_ttl_secs,
        }
    }

    /// Builds the coordinator from configuration around an existing L2 handle.
    pub fn from_config(config: &Config, remote: Arc<dyn RemoteStore>) -> Self {
        let local = LocalStore::new(config.local.max_keys, config.local.std_ttl);
        Self::new(local, remote, config.strategy.clone())
    }

    /// Starts the periodic L1 expiry sweep.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        spawn_sweep_task(self.local.clone(), interval)
    }

    // == Get ==
    /// Returns the cached value, or `None` on a miss, a cached absence or
    /// any failure.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, options: &CacheOptions) -> Option<T> {
        self.lookup(key, options).await.into_option()
    }

    /// Like [`get`](Self::get) but tells a cached absence apart from a miss.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &str, options: &CacheOptions) -> Lookup<T> {
        match self.try_lookup(key, options.layer).await {
            Ok(found) => found,
            Err(e) => {
                error!("Error getting cache key {}: {}", key, e);
                Lookup::Miss
            }
        }
    }

    async fn try_lookup<T: DeserializeOwned>(&self, key: &str, layer: CacheLayer) -> Result<Lookup<T>> {
        validate_key(key)?;

        let Some(raw) = self.read_raw(key, layer).await? else {
            self.record(CacheStats::record_miss);
            return Ok(Lookup::Miss);
        };

        Ok(match codec::decode(&raw)? {
            Some(value) => Lookup::Hit(value),
            None => Lookup::Absent,
        })
    }

    async fn read_raw(&self, key: &str, layer: CacheLayer) -> Result<Option<String>> {
        if layer.includes_l1() {
            let cached = self.local.write().await.get(key);
            if let Some(raw) = cached {
                self.record(CacheStats::record_l1_hit);
                debug!("L1 cache hit: {}", key);
                return Ok(Some(raw));
            }
        }

        if layer.includes_l2() {
            if let Some(raw) = self.remote.get(key).await? {
                self.record(CacheStats::record_l2_hit);
                debug!("L2 cache hit: {}", key);

                // Backfill uses the default local TTL, not the remaining L2 TTL
                if layer == CacheLayer::L1AndL2 {
                    self.local.write().await.set_default(key, raw.clone());
                }
                return Ok(Some(raw));
            }
        }

        Ok(None)
    }

    // == Set ==
    /// Writes the value to every layer in `options.layer`.
    ///
    /// Values that serialize to JSON `null` are stored as the absence
    /// sentinel. Returns `false` if any layer failed; layers may then
    /// disagree until the key is deleted or expires.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, options: &CacheOptions) -> bool {
        match self.try_set(key, value, options).await {
            Ok(()) => true,
            Err(e) => {
                error!("Error setting cache key {}: {}", key, e);
                false
            }
        }
    }

    async fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T, options: &CacheOptions) -> Result<()> {
        validate_key(key)?;
        let serialized = codec::encode(value)?;
        let ttl = self.effective_ttl(key, options);

        self.record(CacheStats::record_set);

        if options.layer.includes_l1() {
            self.local
                .write()
                .await
                .set(key, serialized.clone(), ttl.as_duration());
        }

        if options.layer.includes_l2() {
            match ttl {
                Ttl::Expires(ttl) => {
                    self.remote
                        .set_ex(key, &serialized, ttl.as_secs().max(1))
                        .await?
                }
                Ttl::Never => self.remote.set(key, &serialized).await?,
            }
        }

        debug!("Cache set: {} (layer: {:?}, ttl: {:?})", key, options.layer, ttl);
        Ok(())
    }

    /// Resolves the lifetime of a write: explicit or default TTL, plus
    /// jitter when requested. Hot keys never expire, whatever the value.
    pub fn effective_ttl(&self, key: &str, options: &CacheOptions) -> Ttl {
        if self.strategy.is_hot_key(key) {
            return Ttl::Never;
        }

        let mut seconds = options
            .ttl_seconds
            .filter(|ttl| *ttl > 0)
            .unwrap_or(self.default_ttl_secs);

        if options.random_ttl_jitter && self.strategy.random_ttl_range > 0 {
            seconds += rand::rng().random_range(0..self.strategy.random_ttl_range);
        }

        Ttl::Expires(Duration::from_secs(seconds))
    }

    // == Batch Get ==
    /// Looks up many keys: L1 first, then one MGET to L2 for the keys L1
    /// did not have. L2 hits are backfilled into L1 with the default TTL.
    ///
    /// Every requested key appears in the result; misses, cached absences
    /// and undecodable values map to `None`. An L2 failure turns the keys
    /// L1 missed into misses.
    pub async fn mget<T, K>(&self, keys: &[K]) -> HashMap<String, Option<T>>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
    {
        let mut found = HashMap::with_capacity(keys.len());
        let mut missing: Vec<String> = Vec::new();

        {
            let mut local = self.local.write().await;
            for key in keys {
                let key = key.as_ref();
                if let Err(e) = validate_key(key) {
                    error!("Error getting cache key {:?}: {}", key, e);
                    found.insert(key.to_string(), None);
                    continue;
                }

                match local.get(key) {
                    Some(raw) => {
                        self.record(CacheStats::record_l1_hit);
                        found.insert(key.to_string(), decode_logged(key, &raw));
                    }
                    None => missing.push(key.to_string()),
                }
            }
        }

        if missing.is_empty() {
            return found;
        }

        match self.remote.mget(&missing).await {
            Ok(values) => {
                let mut local = self.local.write().await;
                for (key, value) in missing.into_iter().zip(values) {
                    let decoded = match value {
                        Some(raw) => {
                            self.record(CacheStats::record_l2_hit);
                            let decoded = decode_logged(&key, &raw);
                            local.set_default(&key, raw);
                            decoded
                        }
                        None => {
                            self.record(CacheStats::record_miss);
                            None
                        }
                    };
                    found.insert(key, decoded);
                }
            }
            Err(e) => {
                error!("Error getting {} cache keys from L2: {}", missing.len(), e);
                for key in missing {
                    self.record(CacheStats::record_miss);
                    found.insert(key, None);
                }
            }
        }

        debug!("Cache mget: {} keys", found.len());
        found
    }

    // == Batch Set ==
    /// Writes many values with the same TTL rules as [`set`](Self::set),
    /// sending the L2 writes as one pipeline.
    ///
    /// Nothing is written if any key is empty or any value fails to
    /// serialize. Returns `false` on any failure; as with `set`, L1 keeps
    /// its writes when L2 fails.
    pub async fn mset<K, T>(&self, items: &[(K, T)], options: &CacheOptions) -> bool
    where
        K: AsRef<str>,
        T: Serialize,
    {
        match self.try_mset(items, options).await {
            Ok(()) => true,
            Err(e) => {
                error!("Error setting {} cache keys: {}", items.len(), e);
                false
            }
        }
    }

    async fn try_mset<K, T>(&self, items: &[(K, T)], options: &CacheOptions) -> Result<()>
    where
        K: AsRef<str>,
        T: Serialize,
    {
        if items.is_empty() {
            return Ok(());
        }

        let mut writes = Vec::with_capacity(items.len());
        for (key, value) in items {
            let key = key.as_ref();
            validate_key(key)?;
            let ttl = self.effective_ttl(key, options);
            writes.push((key.to_string(), codec::encode(value)?, ttl));
        }

        {
            let mut counters = self.counters();
            for _ in &writes {
                counters.record_set();
            }
        }

        if options.layer.includes_l1() {
            let mut local = self.local.write().await;
            for (key, serialized, ttl) in &writes {
                local.set(key, serialized.clone(), ttl.as_duration());
            }
        }

        if options.layer.includes_l2() {
            let batch: Vec<BatchWrite> = writes
                .into_iter()
                .map(|(key, value, ttl)| BatchWrite {
                    key,
                    value,
                    ttl_secs: ttl.as_duration().map(|ttl| ttl.as_secs().max(1)),
                })
                .collect();
            self.remote.mset(&batch).await?;
        }

        debug!("Cache mset: {} keys (layer: {:?})", items.len(), options.layer);
        Ok(())
    }

    // == Delete ==
    /// Deletes one key from both layers.
    pub async fn del(&self, key: &str) -> bool {
        self.del_many(&[key]).await
    }

    /// Deletes keys from L1, then issues one bulk delete to L2.
    ///
    /// Returns `false` only if the L2 call failed.
    pub async fn del_many<K: AsRef<str>>(&self, keys: &[K]) -> bool {
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();

        match self.try_del(&keys).await {
            Ok(_) => true,
            Err(e) => {
                error!("Error deleting cache keys {}: {}", keys.join(", "), e);
                false
            }
        }
    }

    async fn try_del(&self, keys: &[String]) -> Result<u64> {
        {
            let mut local = self.local.write().await;
            for key in keys {
                local.delete(key);
            }
        }

        if keys.is_empty() {
            return Ok(0);
        }

        let removed = self.remote.del(keys).await?;
        debug!("Cache deleted: {}", keys.join(", "));
        Ok(removed)
    }

    // == Pattern Delete ==
    /// Deletes every key matching a `*`/`?` glob from both layers.
    ///
    /// Returns the number of distinct keys removed from either layer, or 0
    /// if anything failed (batches deleted before the failure stay deleted).
    pub async fn del_pattern(&self, pattern: &str) -> u64 {
        match self.try_del_pattern(pattern).await {
            Ok(removed) => removed,
            Err(e) => {
                error!("Error deleting pattern {}: {}", pattern, e);
                0
            }
        }
    }

    async fn try_del_pattern(&self, pattern: &str) -> Result<u64> {
        let glob = GlobPattern::new(pattern)?;

        let local_matched: Vec<String> = {
            let mut local = self.local.write().await;
            let matched: Vec<String> = local
                .keys()
                .into_iter()
                .filter(|key| glob.matches(key))
                .collect();
            for key in &matched {
                local.delete(key);
            }
            matched
        };

        let mut remote_matched: Vec<String> = Vec::new();
        let mut cursor = SCAN_START;
        loop {
            let (next, keys) = self
                .remote
                .scan(cursor, glob.as_glob(), SCAN_BATCH_SIZE)
                .await?;

            if !keys.is_empty() {
                self.remote.del(&keys).await?;
                remote_matched.extend(keys);
            }

            cursor = next;
            if cursor == SCAN_START {
                break;
            }
        }

        info!(
            "Pattern deletion: {} (L1: {}, L2: {})",
            pattern,
            local_matched.len(),
            remote_matched.len()
        );

        let removed: HashSet<String> = local_matched.into_iter().chain(remote_matched).collect();
        Ok(removed.len() as u64)
    }

    // == Delayed Double Delete ==
    /// Deletes `key` now and again after `delay`.
    ///
    /// The second delete removes a value a concurrent reader may have
    /// repopulated from a stale source in between. It is fire-and-forget:
    /// failures are logged and not retried. The handle may be dropped.
    pub async fn delayed_double_del(&self, key: &str, delay: Duration) -> JoinHandle<()> {
        self.del(key).await;

        let coordinator = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if coordinator.del(&key).await {
                debug!("Delayed double deletion: {}", key);
            } else {
                warn!("Delayed double deletion failed for {}", key);
            }
        })
    }

    // == Exists ==
    /// Checks L1, then L2. Failures read as `false`.
    pub async fn exists(&self, key: &str) -> bool {
        match self.try_exists(key).await {
            Ok(found) => found,
            Err(e) => {
                error!("Error checking cache key {}: {}", key, e);
                false
            }
        }
    }

    async fn try_exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        if self.local.write().await.contains(key) {
            return Ok(true);
        }
        self.remote.exists(key).await
    }

    // == Get Or Set ==
    /// Cache-aside read: returns the cached value, or computes it with
    /// `factory` and caches the result.
    ///
    /// A factory result of `None` is cached as an absence marker for the
    /// configured null-value TTL (unless `cache_null_on_miss` is off), so
    /// later calls return `None` without running the factory. On a hot key
    /// the marker is permanent like any other hot value. Factory
    /// errors are logged and yield `None`.
    pub async fn get_or_set<T, F, Fut>(&self, key: &str, factory: F, options: &CacheOptions) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        match self.lookup::<T>(key, options).await {
            Lookup::Hit(value) => return Some(value),
            Lookup::Absent => return None,
            Lookup::Miss => {}
        }

        match factory().await {
            Ok(Some(value)) => {
                self.set(key, &value, options).await;
                Some(value)
            }
            Ok(None) => {
                if options.cache_null_on_miss {
                    let absent = CacheOptions {
                        ttl_seconds: Some(self.strategy.null_value_ttl),
                        ..options.clone()
                    };
                    self.set(key, &None::<T>, &absent).await;
                }
                None
            }
            Err(e) => {
                error!("Error in get_or_set for key {}: {:#}", key, e);
                None
            }
        }
    }

    // == Flush ==
    /// Clears both layers entirely.
    pub async fn flush(&self) -> bool {
        self.local.write().await.clear();

        match self.remote.flush_db().await {
            Ok(()) => {
                warn!("All caches flushed");
                true
            }
            Err(e) => {
                error!("Error flushing remote cache: {}", e);
                false
            }
        }
    }

    // == Stats ==
    pub async fn stats(&self) -> StatsReport {
        let local = self.local.read().await.stats();
        let counters = *self.counters();
        counters.report(local)
    }

    pub fn reset_stats(&self) {
        self.counters().reset();
    }

    /// Probes L2 connectivity for health reporting.
    pub async fn remote_available(&self) -> bool {
        match self.remote.exists("health:probe").await {
            Ok(_) => true,
            Err(e) => {
                warn!("Remote cache health probe failed: {}", e);
                false
            }
        }
    }

    fn counters(&self) -> MutexGuard<'_, CacheStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, update: fn(&mut CacheStats)) {
        update(&mut self.counters());
    }
}

fn decode_logged<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    codec::decode(raw).unwrap_or_else(|e| {
        error!("Error decoding cache key {}: {}", key, e);
        None
    })
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
    }
    Ok(())
}
