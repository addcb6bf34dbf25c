use axum::Json;
use crate::models::{HealthResponse, ReadyResponse};
use tracing::debug;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Realtime service is running".to_string(),
    })
}

/// Readiness check endpoint
pub async fn ready_check() -> Json<ReadyResponse> {
    debug!("Readiness check requested");
    // The realtime layer holds no external connections that readiness
    // depends on; the app service is consulted lazily.
    Json(ReadyResponse {
        status: "ok".to_string(),
        message: "Realtime service is ready".to_string(),
    })
}
