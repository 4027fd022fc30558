//! Error types for idrec-identify

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// idrec-common error, mapped by kind
    #[error(transparent)]
    Common(#[from] idrec_common::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        use idrec_common::Error;

        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Common(err) => match err {
                Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                Error::ConstraintViolation(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "CONSTRAINT_VIOLATION")
                }
                Error::InvariantViolation(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INVARIANT_VIOLATION")
                }
                Error::Database(_) if err.is_lock_contention() => {
                    (StatusCode::SERVICE_UNAVAILABLE, "STORE_BUSY")
                }
                Error::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR"),
                Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();
        let message = match &self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Common(idrec_common::Error::InvalidInput(msg)) => msg.clone(),
            ApiError::Common(err) => err.to_string(),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
