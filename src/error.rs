//! HTTP-facing error type.
//!
//! Handlers return `Result<_, ApiError>`; the `IntoResponse` impl maps each
//! variant to a status code and the shared `ErrorResponse` body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::content::ContentError;
use crate::routes::upload::UploadError;
use crate::routes::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required fields: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Database not available")]
    DatabaseUnavailable,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Validation(fields) => ApiError::Validation(fields),
            ContentError::NotFound(what) => ApiError::NotFound(what),
            ContentError::Database(e) => ApiError::Database(e),
            other @ ContentError::SlugExhausted(_) => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Upload(e) => e.status(),
            ApiError::DatabaseUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(fields) => ErrorResponse {
                error: "Validation failed".to_string(),
                message: Some(self.to_string()),
                fields: Some(fields.clone()),
            },
            ApiError::Database(e) => {
                tracing::error!(error = %e, "database error");
                ErrorResponse::new("Database error")
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "internal error");
                ErrorResponse::new("Internal server error")
            }
            ApiError::Upload(UploadError::Io(e)) => {
                tracing::error!(error = %e, "failed to store upload");
                ErrorResponse::new("Failed to save file")
            }
            other => ErrorResponse::new(other.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
