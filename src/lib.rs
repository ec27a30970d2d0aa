//! Tiered Cache - a two-layer cache consistency engine
//!
//! A bounded process-local layer (L1) in front of a shared Redis layer (L2),
//! with TTL jitter, hot-key permanence, negative caching, pattern
//! invalidation and delayed double delete.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheCoordinator, CacheLayer, CacheOptions};
pub use config::Config;
pub use tasks::spawn_sweep_task;
