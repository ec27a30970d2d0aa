//! Response DTOs for the cache admin API
//!
//! Every admin endpoint wraps its payload in [`ApiResponse`].

use serde::Serialize;

/// Standard envelope: `{"success": true, "data": ..., "timestamp": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    /// RFC 3339 timestamp of the response
    pub timestamp: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Payload of `DELETE /cache`
#[derive(Debug, Clone, Serialize)]
pub struct DeleteData {
    pub key: String,
    /// False if the remote layer could not be reached
    pub deleted: bool,
}

/// Payload of `DELETE /cache/pattern`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternDeleteData {
    pub pattern: String,
    pub deleted_count: u64,
}

/// Payload of `GET /cache/exists`
#[derive(Debug, Clone, Serialize)]
pub struct ExistsData {
    pub key: String,
    pub exists: bool,
}

/// Payload of `DELETE /cache/flush`
#[derive(Debug, Clone, Serialize)]
pub struct FlushData {
    pub flushed: bool,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests
    pub status: String,
    /// Whether the remote layer answered a probe
    pub remote: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy(remote: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            remote,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
