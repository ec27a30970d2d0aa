//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_HOT_KEY_PREFIXES: &[&str] = &[
    "user:",
    "role:",
    "permission:",
    "plan:",
    "config:",
    "device:",
];

/// Limits of the process-local layer.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Maximum number of keys held in L1
    pub max_keys: usize,
    /// Interval in seconds between expiry sweeps
    pub check_period: u64,
    /// Default TTL in seconds, also used when backfilling L1 from L2
    pub std_ttl: u64,
}

/// Connection parameters of the shared layer.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db: i64,
    /// Per-command timeout in milliseconds
    pub command_timeout_ms: u64,
}

impl RemoteConfig {
    /// Builds a `redis://` connection URL.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                password, self.host, self.port, self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

/// Consistency and protection knobs applied by the coordinator.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    /// Upper bound (exclusive) in seconds of the random offset added to jittered TTLs
    pub random_ttl_range: u64,
    /// TTL in seconds for cached absence markers
    pub null_value_ttl: u64,
    /// Keys starting with any of these never expire
    pub hot_key_prefixes: Vec<String>,
}

impl StrategyConfig {
    /// Returns true if the key matches a configured hot-key prefix.
    pub fn is_hot_key(&self, key: &str) -> bool {
        self.hot_key_prefixes
            .iter()
            .any(|prefix| key.starts_with(prefix.as_str()))
    }
}

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub local: LocalConfig,
    pub remote: RemoteConfig,
    pub strategy: StrategyConfig,
    /// Admin HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_LOCAL_MAX_KEYS` - Maximum L1 keys (default: 2000)
    /// - `CACHE_LOCAL_CHECK_PERIOD` - L1 sweep interval in seconds (default: 120)
    /// - `CACHE_LOCAL_STD_TTL` - Default TTL in seconds (default: 300)
    /// - `CACHE_REDIS_HOST` / `CACHE_REDIS_PORT` / `CACHE_REDIS_PASSWORD` / `CACHE_REDIS_DB`
    /// - `CACHE_REDIS_TIMEOUT_MS` - Per-command timeout (default: 2000)
    /// - `CACHE_RANDOM_TTL_RANGE` - Jitter range in seconds (default: 60)
    /// - `CACHE_NULL_VALUE_TTL` - Absence marker TTL in seconds (default: 120)
    /// - `CACHE_HOT_KEY_PREFIXES` - Comma separated prefixes
    /// - `SERVER_PORT` - Admin HTTP port (default: 3000)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |name: &str, default| parse_or(&lookup, name, default);

        Self {
            local: LocalConfig {
                max_keys: parsed("CACHE_LOCAL_MAX_KEYS", defaults.local.max_keys as u64) as usize,
                check_period: parsed("CACHE_LOCAL_CHECK_PERIOD", defaults.local.check_period),
                std_ttl: parsed("CACHE_LOCAL_STD_TTL", defaults.local.std_ttl),
            },
            remote: RemoteConfig {
                host: lookup("CACHE_REDIS_HOST").unwrap_or(defaults.remote.host),
                port: parse_or(&lookup, "CACHE_REDIS_PORT", defaults.remote.port),
                password: lookup("CACHE_REDIS_PASSWORD").filter(|p| !p.is_empty()),
                db: parse_or(&lookup, "CACHE_REDIS_DB", defaults.remote.db),
                command_timeout_ms: parsed(
                    "CACHE_REDIS_TIMEOUT_MS",
                    defaults.remote.command_timeout_ms,
                ),
            },
            strategy: StrategyConfig {
                random_ttl_range: parsed("CACHE_RANDOM_TTL_RANGE", defaults.strategy.random_ttl_range),
                null_value_ttl: parsed("CACHE_NULL_VALUE_TTL", defaults.strategy.null_value_ttl),
                hot_key_prefixes: lookup("CACHE_HOT_KEY_PREFIXES")
                    .map(|raw| {
                        raw.split(',')
                            .map(str::trim)
                            .filter(|p| !p.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or(defaults.strategy.hot_key_prefixes),
            },
            server_port: parse_or(&lookup, "SERVER_PORT", defaults.server_port),
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            local: LocalConfig {
                max_keys: 2000,
                check_period: 120,
                std_ttl: 300,
            },
            remote: RemoteConfig {
                host: "localhost".to_string(),
                port: 6379,
                password: None,
                db: 1,
                command_timeout_ms: 2000,
            },
            strategy: StrategyConfig {
                random_ttl_range: 60,
                null_value_ttl: 120,
                hot_key_prefixes: DEFAULT_HOT_KEY_PREFIXES
                    .iter()
                    .map(|p| p.to_string())
                    .collect(),
            },
            server_port: 3000,
        }
    }
}
