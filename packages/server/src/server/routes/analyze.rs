use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::error_response;
use crate::server::app::{AppState, SessionId};

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub url: String,
}

/// Synchronous analysis. Blocks until the verdict is ready or the
/// pipeline gives up.
pub async fn analyze_handler(
    Extension(state): Extension<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    match state
        .controller
        .analyze_sync(&request.url, Some(session_id))
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(&error).into_response(),
    }
}
