use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::error_response;
use crate::domains::analysis::AnalysisJob;
use crate::server::app::{AppState, SessionId};

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub analyses: Vec<AnalysisJob>,
}

/// Recent analyses for the calling session, newest first.
pub async fn history_handler(
    Extension(state): Extension<AppState>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Query(params): Query<HistoryParams>,
) -> Response {
    match state.controller.history(&session_id, params.limit).await {
        Ok(analyses) => (StatusCode::OK, Json(HistoryResponse { analyses })).into_response(),
        Err(error) => error_response(&error).into_response(),
    }
}
