// HTTP routes
pub mod analyze;
pub mod feedback;
pub mod health;
pub mod history;
pub mod jobs;

pub use analyze::*;
pub use feedback::*;
pub use health::*;
pub use history::*;
pub use jobs::*;

use axum::http::StatusCode;
use axum::Json;

use crate::domains::analysis::{AnalysisError, ErrorDetail};

/// Map an analysis failure to its wire shape.
pub(crate) fn error_response(error: &AnalysisError) -> (StatusCode, Json<ErrorDetail>) {
    (status_for(error), Json(ErrorDetail::from(error)))
}

fn status_for(error: &AnalysisError) -> StatusCode {
    match error {
        AnalysisError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
        AnalysisError::Unsupported { .. } | AnalysisError::Empty { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AnalysisError::Unreachable { .. } => StatusCode::BAD_GATEWAY,
        AnalysisError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        AnalysisError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        AnalysisError::MalformedResponse { .. } | AnalysisError::AuthFailure { .. } => {
            StatusCode::BAD_GATEWAY
        }
        AnalysisError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_map_to_distinct_statuses() {
        let cases = [
            (
                AnalysisError::InvalidRequest {
                    detail: "x".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                AnalysisError::Empty { detail: "x".into() },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AnalysisError::Unreachable { detail: "x".into() },
                StatusCode::BAD_GATEWAY,
            ),
            (
                AnalysisError::Timeout { detail: "x".into() },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                AnalysisError::RateLimited { detail: "x".into() },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                AnalysisError::Internal { detail: "x".into() },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(status_for(&error), expected, "kind {}", error.kind());
        }
    }
}
