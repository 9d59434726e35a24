use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `INVALID_ATTACHMENT_FORMAT`, `TOKEN_MISSING`, `TOKEN_INVALID`,
    /// `INVALID_CREDENTIALS`, `PERMISSION_DENIED`, `NOT_FOUND`,
    /// `EMAIL_TAKEN`, `AGGREGATION_FAILURE`, `STORAGE_FAILURE`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Please fill in all the fields")]
    pub message: String,
    /// Names of the required fields missing from the request. Only set
    /// for missing-field validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = json!(["title", "points"]))]
    pub empty_fields: Option<Vec<String>>,
}

impl ErrorBody {
    fn new(code: &'static str, message: String) -> Self {
        Self {
            code,
            message,
            empty_fields: None,
        }
    }
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    /// One or more required fields were absent. Lists every offending
    /// field, not just the first.
    MissingFields(Vec<String>),
    /// Certificate filename extension outside the pdf/jpg/jpeg/png
    /// allow-list.
    InvalidAttachmentFormat(String),
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied,
    NotFound(String),
    EmailTaken,
    /// The report pipeline failed; no partial results are returned.
    Aggregation(String),
    Storage(StorageError),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("VALIDATION_ERROR", msg),
            ),
            AppError::MissingFields(fields) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: "Please fill in all the fields".into(),
                    empty_fields: Some(fields),
                },
            ),
            AppError::InvalidAttachmentFormat(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("INVALID_ATTACHMENT_FORMAT", msg),
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("TOKEN_MISSING", "Authentication required".into()),
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("TOKEN_INVALID", "Invalid or expired token".into()),
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("INVALID_CREDENTIALS", "Invalid email or password".into()),
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody::new("PERMISSION_DENIED", "Insufficient permissions".into()),
            ),
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorBody::new("NOT_FOUND", msg))
            }
            AppError::EmailTaken => (
                StatusCode::CONFLICT,
                ErrorBody::new("EMAIL_TAKEN", "Email is already registered".into()),
            ),
            AppError::Aggregation(detail) => {
                tracing::error!("Aggregation failure: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("AGGREGATION_FAILURE", "Report generation failed".into()),
                )
            }
            AppError::Storage(err) => {
                tracing::error!("Storage failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("STORAGE_FAILURE", "A storage operation failed".into()),
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("INTERNAL_ERROR", "An unexpected error occurred".into()),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}
