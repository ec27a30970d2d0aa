//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside the cache.
//!
//! # Tasks
//! - L1 sweep: Removes expired local entries at the configured check period

mod sweep;

pub use sweep::spawn_sweep_task;
