use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use compute::error::ComputeError;
use tracing::error;

use crate::schemas::ErrorResponse;

/// Request-boundary error. Wraps the compute taxonomy and the extractor
/// failures, and renders everything as the structured error envelope.
#[derive(Debug)]
pub enum ApiError {
    /// No usable actor identity on the request.
    Unauthorized(String),
    Compute(ComputeError),
}

impl From<ComputeError> for ApiError {
    fn from(err: ComputeError) -> Self {
        ApiError::Compute(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Compute(err) => match err {
                ComputeError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                ComputeError::DuplicateLoanCode(_) | ComputeError::DuplicateUsername(_) => {
                    (StatusCode::CONFLICT, "CONFLICT")
                }
                ComputeError::PaymentExceedsBalance { .. }
                | ComputeError::CollectedExceedsOutstanding
                | ComputeError::CollectorHasLoans { .. }
                | ComputeError::CollectorFieldRestriction => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "DOMAIN_ERROR")
                }
                ComputeError::AccessDenied => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                ComputeError::LoanNotFound(_)
                | ComputeError::CollectorNotFound(_)
                | ComputeError::UserNotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                ComputeError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            // Database details stay in the log, not the response.
            ApiError::Compute(ComputeError::Database(db_err)) => {
                error!("Database error: {}", db_err);
                "Internal server error".to_string()
            }
            ApiError::Unauthorized(msg) => msg.clone(),
            ApiError::Compute(err) => err.to_string(),
        };
        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            success: false,
        };
        (status, Json(body)).into_response()
    }
}
