//! API Routes
//!
//! Configures the Axum router with all admin endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, delete_pattern_handler, exists_handler, flush_handler, health_handler,
    reset_stats_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin (the admin surface is expected behind a gateway)
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/cache", delete(delete_handler))
        .route("/cache/pattern", delete(delete_pattern_handler))
        .route("/cache/exists", get(exists_handler))
        .route("/cache/flush", delete(flush_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache/stats/reset", post(reset_stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    use crate::cache::{CacheCoordinator, MemoryRemoteStore};
    use crate::config::Config;

    fn create_test_app() -> Router {
        let remote = Arc::new(MemoryRemoteStore::new());
        let cache = CacheCoordinator::from_config(&Config::default(), remote);
        create_router(AppState::new(cache))
    }

    async fn status_of(method: &str, uri: &str) -> StatusCode {
        create_test_app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        assert_eq!(status_of("GET", "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        assert_eq!(status_of("GET", "/cache/stats").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_reset_requires_post() {
        assert_eq!(
            status_of("GET", "/cache/stats/reset").await,
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(status_of("POST", "/cache/stats/reset").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_key_is_bad_request() {
        assert_eq!(status_of("DELETE", "/cache").await, StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of("GET", "/cache/exists?key=").await,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of("DELETE", "/cache/pattern").await,
            StatusCode::BAD_REQUEST
        );
    }
}
