//! In-process remote store.
//!
//! Mirrors the Redis command semantics the coordinator relies on (TTL,
//! variadic DEL, glob-filtered cursor SCAN) without a network hop. Used for
//! tests and single-node development; it can also simulate outages.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{BatchWrite, RemoteStore, SCAN_START};
use crate::cache::GlobPattern;
use crate::error::{CacheError, Result};

/// Scans left open beyond this many have their oldest cursor dropped.
const MAX_OPEN_CURSORS: usize = 64;

#[derive(Debug)]
struct StoredValue {
    value: String,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

#[derive(Debug, Default)]
struct State {
    entries: BTreeMap<String, StoredValue>,
    /// Open scan cursors → last key examined, oldest first
    cursors: BTreeMap<u64, String>,
    next_cursor: u64,
    /// Commands issued, by name
    calls: HashMap<&'static str, u64>,
    /// Commands that fail once their remaining success budget is spent
    failures: HashMap<&'static str, u64>,
}

/// Shared-store stand-in backed by an ordered map.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every command fails with [`CacheError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Lets `command` succeed `successes` more times, then fail until cleared.
    pub fn fail_after(&self, command: &'static str, successes: u64) {
        self.lock().failures.insert(command, successes);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Number of times `command` was issued (failed attempts included).
    pub fn command_count(&self, command: &str) -> u64 {
        self.lock().calls.get(command).copied().unwrap_or(0)
    }

    /// Remaining lifetime of a live key; `Some(None)` for a key without expiry.
    pub fn ttl(&self, key: &str) -> Option<Option<Duration>> {
        let now = Instant::now();
        let state = self.lock();
        let stored = state.entries.get(key).filter(|s| s.is_live(now))?;
        Some(
            stored
                .expires_at
                .map(|deadline| deadline.saturating_duration_since(now)),
        )
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .entries
            .values()
            .filter(|stored| stored.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the command and applies any simulated failure.
    fn begin(&self, command: &'static str) -> Result<MutexGuard<'_, State>> {
        let mut state = self.lock();
        *state.calls.entry(command).or_insert(0) += 1;

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable(format!(
                "{} failed: connection refused",
                command
            )));
        }

        if let Some(remaining) = state.failures.get_mut(command) {
            if *remaining == 0 {
                return Err(CacheError::Unavailable(format!(
                    "{} failed: injected failure",
                    command
                )));
            }
            *remaining -= 1;
        }

        Ok(state)
    }

    fn write(&self, command: &'static str, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut state = self.begin(command)?;
        state.entries.insert(
            key.to_string(),
            StoredValue {
                value: value.to_string(),
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut state = self.begin("GET")?;
        let lookup = state
            .entries
            .get(key)
            .map(|stored| stored.is_live(now).then(|| stored.value.clone()));

        match lookup {
            Some(Some(value)) => Ok(Some(value)),
            Some(None) => {
                state.entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write("SET", key, value, None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        if ttl_secs == 0 {
            return Err(CacheError::InvalidRequest(
                "invalid expire time in 'setex' command".to_string(),
            ));
        }
        self.write("SETEX", key, value, Some(Duration::from_secs(ttl_secs)))
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        let now = Instant::now();
        let state = self.begin("MGET")?;
        Ok(keys
            .iter()
            .map(|key| {
                state
                    .entries
                    .get(key)
                    .filter(|stored| stored.is_live(now))
                    .map(|stored| stored.value.clone())
            })
            .collect())
    }

    async fn mset(&self, writes: &[BatchWrite]) -> Result<()> {
        let mut state = self.begin("MSET")?;
        if writes.iter().any(|write| write.ttl_secs == Some(0)) {
            return Err(CacheError::InvalidRequest(
                "invalid expire time in 'setex' command".to_string(),
            ));
        }

        let now = Instant::now();
        for write in writes {
            state.entries.insert(
                write.key.clone(),
                StoredValue {
                    value: write.value.clone(),
                    expires_at: write.ttl_secs.map(|ttl| now + Duration::from_secs(ttl)),
                },
            );
        }
        Ok(())
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        let now = Instant::now();
        let mut state = self.begin("DEL")?;
        let removed = keys
            .iter()
            .filter_map(|key| state.entries.remove(key))
            .filter(|stored| stored.is_live(now))
            .count();
        Ok(removed as u64)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let state = self.begin("EXISTS")?;
        Ok(state
            .entries
            .get(key)
            .is_some_and(|stored| stored.is_live(now)))
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)> {
        let glob = GlobPattern::new(pattern)?;
        let now = Instant::now();
        let mut state = self.begin("SCAN")?;

        let lower = if cursor == SCAN_START {
            Bound::Unbounded
        } else {
            match state.cursors.remove(&cursor) {
                Some(last) => Bound::Excluded(last),
                None => {
                    return Err(CacheError::InvalidRequest(format!(
                        "invalid cursor {}",
                        cursor
                    )))
                }
            }
        };

        // Examine up to `count` keys; the cursor resumes after the last one.
        let examined: Vec<(&String, &StoredValue)> = state
            .entries
            .range::<String, _>((lower, Bound::Unbounded))
            .take(count.max(1))
            .collect();

        let exhausted = examined.len() < count.max(1);
        let last = examined.last().map(|(key, _)| (*key).clone());
        let batch: Vec<String> = examined
            .into_iter()
            .filter(|(key, stored)| stored.is_live(now) && glob.matches(key))
            .map(|(key, _)| key.clone())
            .collect();

        let next = match last {
            Some(last) if !exhausted => {
                // Abandoned scans never come back for their cursor
                while state.cursors.len() >= MAX_OPEN_CURSORS {
                    state.cursors.pop_first();
                }
                state.next_cursor += 1;
                let id = state.next_cursor;
                state.cursors.insert(id, last);
                id
            }
            _ => SCAN_START,
        };

        Ok((next, batch))
    }

    async fn flush_db(&self) -> Result<()> {
        let mut state = self.begin("FLUSHDB")?;
        state.entries.clear();
        state.cursors.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    async fn scan_all(store: &MemoryRemoteStore, pattern: &str, count: usize) -> Vec<String> {
        let mut cursor = SCAN_START;
        let mut found = Vec::new();
        loop {
            let (next, batch) = store.scan(cursor, pattern, count).await.unwrap();
            found.extend(batch);
            cursor = next;
            if cursor == SCAN_START {
                break;
            }
        }
        found
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_get_and_expiry() {
        let store = MemoryRemoteStore::new();
        store.set_ex("order:42", "1", 60).await.unwrap();
        store.set("user:1", "2").await.unwrap();

        assert_eq!(store.get("order:42").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.ttl("user:1"), Some(None));

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.get("order:42").await.unwrap(), None);
        assert!(!store.exists("order:42").await.unwrap());
        assert!(store.exists("user:1").await.unwrap());
    }

    #[tokio::test]
    async fn test_setex_zero_rejected() {
        let store = MemoryRemoteStore::new();
        assert_err!(store.set_ex("k", "v", 0).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mset_and_mget() {
        let store = MemoryRemoteStore::new();
        let writes = vec![
            BatchWrite {
                key: "a".to_string(),
                value: "1".to_string(),
                ttl_secs: Some(10),
            },
            BatchWrite {
                key: "b".to_string(),
                value: "2".to_string(),
                ttl_secs: None,
            },
        ];
        store.mset(&writes).await.unwrap();
        assert_eq!(store.command_count("MSET"), 1);

        let keys = ["a", "missing", "b"].map(String::from);
        assert_eq!(
            store.mget(&keys).await.unwrap(),
            vec![Some("1".to_string()), None, Some("2".to_string())]
        );

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(
            store.mget(&keys).await.unwrap(),
            vec![None, None, Some("2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_mset_rejects_zero_ttl_without_writing() {
        let store = MemoryRemoteStore::new();
        let writes = vec![
            BatchWrite {
                key: "a".to_string(),
                value: "1".to_string(),
                ttl_secs: None,
            },
            BatchWrite {
                key: "b".to_string(),
                value: "2".to_string(),
                ttl_secs: Some(0),
            },
        ];

        assert_err!(store.mset(&writes).await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_del_counts_existing_keys() {
        let store = MemoryRemoteStore::new();
        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();

        let removed = store
            .del(&["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert!(store.is_empty());
        assert_eq!(store.command_count("DEL"), 1);
    }

    #[tokio::test]
    async fn test_scan_visits_every_match_in_batches() {
        let store = MemoryRemoteStore::new();
        for i in 0..250 {
            store.set(&format!("user:{}", i), "1").await.unwrap();
        }
        store.set("role:1", "1").await.unwrap();

        let found = scan_all(&store, "user:*", 100).await;

        assert_eq!(found.len(), 250);
        assert!(found.iter().all(|k| k.starts_with("user:")));
        assert!(store.command_count("SCAN") >= 3);
    }

    #[tokio::test]
    async fn test_scan_tolerates_deletes_between_batches() {
        let store = MemoryRemoteStore::new();
        for i in 0..30 {
            store.set(&format!("k:{:02}", i), "1").await.unwrap();
        }

        let mut cursor = SCAN_START;
        let mut total = 0;
        loop {
            let (next, batch) = store.scan(cursor, "k:*", 10).await.unwrap();
            total += store.del(&batch).await.unwrap();
            cursor = next;
            if cursor == SCAN_START {
                break;
            }
        }

        assert_eq!(total, 30);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_and_injected_failures() {
        let store = MemoryRemoteStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.get("k").await,
            Err(CacheError::Unavailable(_))
        ));
        store.set_unavailable(false);

        store.fail_after("SET", 1);
        assert_ok!(store.set("a", "1").await);
        assert_err!(store.set("b", "1").await);
        store.clear_failures();
        assert_ok!(store.set("b", "1").await);
        assert_eq!(store.command_count("SET"), 3);
    }

    #[tokio::test]
    async fn test_abandoned_scans_do_not_accumulate_cursors() {
        let store = MemoryRemoteStore::new();
        for i in 0..20 {
            store.set(&format!("k:{:02}", i), "1").await.unwrap();
        }

        for _ in 0..(MAX_OPEN_CURSORS * 2) {
            let (next, _) = store.scan(SCAN_START, "k:*", 5).await.unwrap();
            assert_ne!(next, SCAN_START);
        }
        assert_eq!(store.lock().cursors.len(), MAX_OPEN_CURSORS);

        // The most recent scan can still resume
        let (latest, _) = store.scan(SCAN_START, "k:*", 5).await.unwrap();
        assert_ok!(store.scan(latest, "k:*", 5).await);

        store.flush_db().await.unwrap();
        assert!(store.lock().cursors.is_empty());
    }

    #[tokio::test]
    async fn test_flush_db() {
        let store = MemoryRemoteStore::new();
        store.set("a", "1").await.unwrap();
        store.flush_db().await.unwrap();
        assert!(store.is_empty());
    }
}
