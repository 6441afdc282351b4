use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use serde::Serialize;

use crate::error::ServiceError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map a service failure onto its HTTP status. Server faults are logged and
/// reported with a generic message.
pub fn service_error(err: ServiceError) -> ApiError {
    match err {
        ServiceError::Validation(msg) => error(StatusCode::BAD_REQUEST, msg),
        ServiceError::NotFound => error(StatusCode::NOT_FOUND, err.to_string()),
        ServiceError::Render(e) => error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        ServiceError::AllocationExhausted { attempts } => {
            tracing::error!(attempts, "short code allocation exhausted");
            error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate unique short code",
            )
        }
        ServiceError::Storage(e) => {
            tracing::error!("storage failure: {:#}", e);
            error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Malformed or incomplete JSON bodies are client errors
pub fn body_rejection(rejection: JsonRejection) -> ApiError {
    error(StatusCode::BAD_REQUEST, rejection.body_text())
}
