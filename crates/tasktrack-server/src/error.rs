use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use tasktrack_core::FieldError;
use tasktrack_engine::ServiceError;

const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Error body for single-cause failures: `{errorCode, errorMessage}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error_code: &'static str,
    pub error_message: String,
}

/// Everything a handler can fail with. The `IntoResponse` impl is the only
/// place errors are turned into HTTP statuses.
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    /// Request could not be decoded (body, path or query).
    BadRequest(FieldError),
}

impl ApiError {
    pub fn bad_request(field: &str, message: impl Into<String>) -> Self {
        Self::BadRequest(FieldError::new(field, message))
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError::Service(e)
    }
}

fn single(status: StatusCode, error_code: &'static str, error_message: String) -> Response {
    (
        status,
        Json(ErrorBody {
            error_code,
            error_message,
        }),
    )
        .into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(field) => {
                (StatusCode::BAD_REQUEST, Json(vec![field])).into_response()
            }
            ApiError::Service(ServiceError::InvalidFields(errors)) => {
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            ApiError::Service(ServiceError::NotFound(msg)) => {
                single(StatusCode::NOT_FOUND, "TASK_ERROR", msg)
            }
            // 304 is the established signal for a refused modification.
            ApiError::Service(ServiceError::Validation(msg)) => {
                single(StatusCode::NOT_MODIFIED, "MODIFICATION_ERROR", msg)
            }
            ApiError::Service(ServiceError::Conflict(msg)) => {
                single(StatusCode::CONFLICT, "CONFLICT", msg)
            }
            ApiError::Service(ServiceError::Store(e)) => {
                tracing::error!(error = %e, "request failed");
                single(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
        }
    }
}
