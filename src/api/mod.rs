//! API Module
//!
//! Administrative HTTP surface over the cache coordinator.
//!
//! # Endpoints
//! - `GET /cache/stats` - Layer and aggregate statistics
//! - `POST /cache/stats/reset` - Zero the counters
//! - `DELETE /cache/flush` - Clear both layers
//! - `DELETE /cache?key=K` - Delete one key
//! - `DELETE /cache/pattern?pattern=P` - Delete keys matching a glob
//! - `GET /cache/exists?key=K` - Check whether a key is cached
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
