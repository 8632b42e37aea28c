use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::error_response;
use crate::domains::analysis::ErrorDetail;
use crate::server::app::{AppState, SessionId};

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub job_id: String,
    pub agrees: bool,
    #[serde(default)]
    pub note: Option<String>,
}

/// Record agreement or disagreement with a finished verdict.
pub async fn feedback_handler(
    Extension(state): Extension<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Json(request): Json<FeedbackRequest>,
) -> Response {
    match state
        .controller
        .record_feedback(
            &request.job_id,
            Some(session_id),
            request.agrees,
            request.note,
        )
        .await
    {
        Ok(Some(feedback)) => (StatusCode::CREATED, Json(feedback)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorDetail {
                kind: "not_found".to_string(),
                detail: format!("no job {}", request.job_id),
            }),
        )
            .into_response(),
        Err(error) => error_response(&error).into_response(),
    }
}
