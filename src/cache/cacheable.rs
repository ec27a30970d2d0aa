//! Call-site caching wrappers.
//!
//! [`Cacheable`] wraps a computation with a cache read and a write-back;
//! [`CacheEvict`] runs a mutation and then invalidates the keys it affects.
//! Both build keys from a [`KeyTemplate`] with positional placeholders.
//!
//! ```ignore
//! let find_device = Cacheable::new("device:{0}", 300);
//! let device = find_device
//!     .call(&cache, &[&id], || repo.find_device(&id))
//!     .await?;
//!
//! let update = CacheEvict::new(["device:{0}", "devices:user:{1}:list"]);
//! update.run(&cache, &[&id, &user_id], || repo.update(&id, dto)).await?;
//! ```

use std::fmt::Display;
use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::cache::{codec, CacheCoordinator, CacheOptions, Lookup};

/// Cache key pattern such as `"devices:user:{0}:status:{1}"`.
///
/// `{N}` is replaced by the N-th argument; an index without an argument
/// renders as an empty string. Anything else is copied verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    template: String,
}

impl KeyTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, args: &[&dyn Display]) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let index = after
                .find('}')
                .and_then(|close| after[..close].parse::<usize>().ok().map(|i| (i, close)));

            match index {
                Some((i, close)) => {
                    if let Some(arg) = args.get(i) {
                        out.push_str(&arg.to_string());
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

type Condition = Box<dyn Fn(&[&dyn Display]) -> bool + Send + Sync>;

/// Read-through wrapper around a fallible computation.
///
/// Unlike [`CacheCoordinator::get_or_set`], errors from the computation are
/// returned to the caller; only successful, non-null results are cached.
pub struct Cacheable {
    key: KeyTemplate,
    options: CacheOptions,
    condition: Option<Condition>,
}

impl Cacheable {
    pub fn new(template: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            key: KeyTemplate::new(template),
            options: CacheOptions::new().ttl(ttl_seconds),
            condition: None,
        }
    }

    pub fn with_options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    /// Only consult the cache when `condition` holds for the arguments.
    pub fn when<F>(mut self, condition: F) -> Self
    where
        F: Fn(&[&dyn Display]) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Box::new(condition));
        self
    }

    pub async fn call<T, F, Fut>(
        &self,
        cache: &CacheCoordinator,
        args: &[&dyn Display],
        compute: F,
    ) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Some(condition) = &self.condition {
            if !condition(args) {
                return compute().await;
            }
        }

        let key = self.key.render(args);
        if let Lookup::Hit(cached) = cache.lookup::<T>(&key, &self.options).await {
            debug!("Cacheable hit: {}", key);
            return Ok(cached);
        }

        let value = compute().await?;
        if codec::is_null(&value) {
            debug!("Cacheable skipped null result: {}", key);
        } else {
            cache.set(&key, &value, &self.options).await;
        }
        Ok(value)
    }
}

/// Invalidates keys (and optionally a glob) after a successful mutation.
#[derive(Debug, Clone)]
pub struct CacheEvict {
    keys: Vec<KeyTemplate>,
    pattern: Option<KeyTemplate>,
}

impl CacheEvict {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(KeyTemplate::new).collect(),
            pattern: None,
        }
    }

    /// Also delete every key matching this (templated) glob.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(KeyTemplate::new(pattern));
        self
    }

    /// Runs `mutation`; if it succeeds, deletes the rendered keys.
    pub async fn run<T, F, Fut>(
        &self,
        cache: &CacheCoordinator,
        args: &[&dyn Display],
        mutation: F,
    ) -> anyhow::Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let result = mutation().await?;
        self.evict(cache, args).await;
        Ok(result)
    }

    /// Deletes the rendered keys and pattern now; returns the keys deleted.
    pub async fn evict(&self, cache: &CacheCoordinator, args: &[&dyn Display]) -> Vec<String> {
        let keys: Vec<String> = self.keys.iter().map(|t| t.render(args)).collect();
        if !keys.is_empty() {
            cache.del_many(&keys).await;
        }

        if let Some(pattern) = &self.pattern {
            let glob = pattern.render(args);
            let removed = cache.del_pattern(&glob).await;
            debug!("CacheEvict removed {} keys matching {}", removed, glob);
        }

        keys
    }
}
