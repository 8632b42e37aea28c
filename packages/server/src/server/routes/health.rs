use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

/// Liveness probe. Constant payload, independent of pipeline health.
pub async fn health_handler() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            service: "bias-analyzer-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
