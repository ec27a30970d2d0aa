//! API Handlers
//!
//! HTTP request handlers for each admin endpoint.

use axum::{
    extract::{Query, State},
    Json,
};
use tracing::info;

use crate::cache::{CacheCoordinator, StatsReport};
use crate::error::Result;
use crate::models::{
    ApiResponse, DeleteData, ExistsData, FlushData, HealthResponse, KeyQuery, PatternDeleteData,
    PatternQuery,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: CacheCoordinator,
}

impl AppState {
    pub fn new(cache: CacheCoordinator) -> Self {
        Self { cache }
    }
}

/// Handler for GET /cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<ApiResponse<StatsReport>> {
    Json(ApiResponse::ok(state.cache.stats().await))
}

/// Handler for POST /cache/stats/reset
pub async fn reset_stats_handler(State(state): State<AppState>) -> Json<ApiResponse<()>> {
    state.cache.reset_stats();
    info!("Cache statistics reset");
    Json(ApiResponse::ok(()))
}

/// Handler for DELETE /cache/flush
pub async fn flush_handler(State(state): State<AppState>) -> Json<ApiResponse<FlushData>> {
    let flushed = state.cache.flush().await;
    Json(ApiResponse::ok(FlushData { flushed }))
}

/// Handler for DELETE /cache?key=K
pub async fn delete_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<ApiResponse<DeleteData>>> {
    let key = query.require()?;
    let deleted = state.cache.del(&key).await;

    Ok(Json(ApiResponse::ok(DeleteData { key, deleted })))
}

/// Handler for DELETE /cache/pattern?pattern=P
pub async fn delete_pattern_handler(
    State(state): State<AppState>,
    Query(query): Query<PatternQuery>,
) -> Result<Json<ApiResponse<PatternDeleteData>>> {
    let pattern = query.require()?;
    let deleted_count = state.cache.del_pattern(&pattern).await;

    Ok(Json(ApiResponse::ok(PatternDeleteData {
        pattern,
        deleted_count,
    })))
}

/// Handler for GET /cache/exists?key=K
pub async fn exists_handler(
    State(state): State<AppState>,
    Query(query): Query<KeyQuery>,
) -> Result<Json<ApiResponse<ExistsData>>> {
    let key = query.require()?;
    let exists = state.cache.exists(&key).await;

    Ok(Json(ApiResponse::ok(ExistsData { key, exists })))
}

/// Handler for GET /health
///
/// A remote outage shows up here as `remote: false`; cache operations
/// themselves never report it.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.remote_available().await))
}
