//! Per-call cache options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which layers an operation touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheLayer {
    L1Only,
    L2Only,
    #[default]
    L1AndL2,
}

impl CacheLayer {
    pub fn includes_l1(self) -> bool {
        matches!(self, CacheLayer::L1Only | CacheLayer::L1AndL2)
    }

    pub fn includes_l2(self) -> bool {
        matches!(self, CacheLayer::L2Only | CacheLayer::L1AndL2)
    }
}

/// Effective lifetime of a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Expires(Duration),
    Never,
}

impl Ttl {
    pub fn as_duration(self) -> Option<Duration> {
        match self {
            Ttl::Expires(ttl) => Some(ttl),
            Ttl::Never => None,
        }
    }
}

/// Options accepted by `get`, `set` and `get_or_set`.
///
/// ```
/// use tiered_cache::cache::{CacheLayer, CacheOptions};
///
/// let opts = CacheOptions::new().ttl(600).jitter().layer(CacheLayer::L2Only);
/// assert_eq!(opts.ttl_seconds, Some(600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    /// Lifetime in seconds; `None` or `Some(0)` uses the configured default
    pub ttl_seconds: Option<u64>,
    pub layer: CacheLayer,
    /// Add a random offset to the TTL so simultaneous writes expire apart
    pub random_ttl_jitter: bool,
    /// `get_or_set` caches a missing value as the absence sentinel
    pub cache_null_on_miss: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl_seconds: None,
            layer: CacheLayer::default(),
            random_ttl_jitter: false,
            cache_null_on_miss: true,
        }
    }
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, seconds: u64) -> Self {
        self.ttl_seconds = Some(seconds);
        self
    }

    pub fn layer(mut self, layer: CacheLayer) -> Self {
        self.layer = layer;
        self
    }

    pub fn jitter(mut self) -> Self {
        self.random_ttl_jitter = true;
        self
    }

    pub fn skip_null_caching(mut self) -> Self {
        self.cache_null_on_miss = false;
        self
    }
}
