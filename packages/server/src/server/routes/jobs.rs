use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::error_response;
use crate::domains::analysis::ErrorDetail;
use crate::server::app::{AppState, SessionId};

#[derive(Deserialize)]
pub struct SubmitJobRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct SubmitJobResponse {
    pub job_id: String,
}

/// Queue an analysis job and return its id immediately.
pub async fn submit_job_handler(
    Extension(state): Extension<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Json(request): Json<SubmitJobRequest>,
) -> Response {
    match state
        .controller
        .submit_job(&request.url, Some(session_id))
        .await
    {
        Ok(job_id) => (StatusCode::ACCEPTED, Json(SubmitJobResponse { job_id })).into_response(),
        Err(error) => error_response(&error).into_response(),
    }
}

/// Poll a job. `result`/`error` appear only once the job is terminal.
pub async fn get_job_handler(
    Extension(state): Extension<AppState>,
    Path(job_id): Path<String>,
) -> Response {
    match state.controller.get_job(&job_id).await {
        Ok(Some(job)) => (StatusCode::OK, Json(job)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorDetail {
                kind: "not_found".to_string(),
                detail: format!("no job {job_id}"),
            }),
        )
            .into_response(),
        Err(error) => error_response(&error).into_response(),
    }
}
