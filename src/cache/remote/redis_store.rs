//! Redis-backed remote store.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use tokio::time::timeout;
use tracing::info;

use super::{BatchWrite, RemoteStore};
use crate::config::RemoteConfig;
use crate::error::{CacheError, Result};

/// Redis adapter over an auto-reconnecting connection manager.
///
/// Every command is bounded by the configured per-command timeout; an
/// elapsed timeout is reported as [`CacheError::Unavailable`].
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    command_timeout: Duration,
}

impl RedisStore {
    /// Connects using the host/port/password/db in `config`.
    pub async fn connect(config: &RemoteConfig) -> Result<Self> {
        let client = redis::Client::open(config.url())?;
        let command_timeout = config.command_timeout();

        let conn = timeout(command_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                CacheError::Unavailable(format!(
                    "Timed out connecting to Redis at {}:{}",
                    config.host, config.port
                ))
            })??;

        info!(
            "Connected to Redis at {}:{} (db {})",
            config.host, config.port, config.db
        );

        Ok(Self {
            conn,
            command_timeout,
        })
    }

    async fn bounded<T, F>(&self, command: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match timeout(self.command_timeout, fut).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Unavailable(format!(
                "{} timed out after {:?}",
                command, self.command_timeout
            ))),
        }
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        self.bounded("GET", conn.get(key)).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        self.bounded("SET", conn.set(key, value)).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        self.bounded("SETEX", conn.set_ex(key, value, ttl_secs)).await
    }

    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        // Explicit MGET: the typed helper sends GET for a single key
        let mut cmd = redis::cmd("MGET");
        cmd.arg(keys);
        self.bounded("MGET", cmd.query_async(&mut conn)).await
    }

    async fn mset(&self, writes: &[BatchWrite]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for write in writes {
            match write.ttl_secs {
                Some(ttl) => pipe.set_ex(&write.key, &write.value, ttl).ignore(),
                None => pipe.set(&write.key, &write.value).ignore(),
            };
        }
        self.bounded("MSET", pipe.query_async(&mut conn)).await
    }

    async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let removed: usize = self.bounded("DEL", conn.del(keys.to_vec())).await?;
        Ok(removed as u64)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        self.bounded("EXISTS", conn.exists(key)).await
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> Result<(u64, Vec<String>)> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count);
        self.bounded("SCAN", cmd.query_async(&mut conn)).await
    }

    async fn flush_db(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let cmd = redis::cmd("FLUSHDB");
        self.bounded("FLUSHDB", cmd.query_async(&mut conn)).await
    }
}
