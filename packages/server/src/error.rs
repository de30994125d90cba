use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;
use uuid::Uuid;

use crate::database::StepTimeout;
use crate::services::ingest::IngestError;
use crate::services::ledger::LedgerError;
use crate::services::quota::QuotaUsage;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `PERMISSION_DENIED`, `NOT_FOUND`, `DUPLICATE_CONTENT`,
    /// `QUOTA_EXCEEDED`, `STORAGE_ERROR`, `PERSISTENCE_ERROR`, `TIMEOUT`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Title must be 1-256 characters")]
    pub message: String,
    /// Extra machine-readable context. Present for `DUPLICATE_CONTENT`
    /// (`existing_id`) and `QUOTA_EXCEEDED` (`window`, `limit`, `count`, `remaining`).
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    PermissionDenied,
    NotFound(String),
    /// The submitted content matches an active meme.
    Duplicate {
        existing_id: Uuid,
    },
    QuotaExceeded(QuotaUsage),
    Storage(String),
    Persistence(String),
    /// A bounded external call did not answer in time.
    Timeout(&'static str),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("VALIDATION_ERROR", msg),
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("TOKEN_MISSING", "Authentication required"),
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("TOKEN_INVALID", "Invalid or expired token"),
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody::new("PERMISSION_DENIED", "Insufficient permissions"),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::new("NOT_FOUND", msg)),
            AppError::Duplicate { existing_id } => (
                StatusCode::CONFLICT,
                ErrorBody::new(
                    "DUPLICATE_CONTENT",
                    "This meme has already been submitted",
                )
                .with_details(serde_json::json!({ "existing_id": existing_id })),
            ),
            AppError::QuotaExceeded(usage) => (
                StatusCode::TOO_MANY_REQUESTS,
                ErrorBody::new(
                    "QUOTA_EXCEEDED",
                    format!(
                        "{} upload limit reached ({}/{} used)",
                        usage.window.label(),
                        usage.count,
                        usage.limit
                    ),
                )
                .with_details(serde_json::json!({
                    "window": usage.window,
                    "limit": usage.limit,
                    "count": usage.count,
                    "remaining": usage.remaining,
                })),
            ),
            AppError::Storage(detail) => {
                tracing::error!("Storage error: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorBody::new("STORAGE_ERROR", "Failed to store the image, try again"),
                )
            }
            AppError::Persistence(detail) => {
                tracing::error!("Persistence error: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody::new("PERSISTENCE_ERROR", "Failed to save the meme, try again"),
                )
            }
            AppError::Timeout(step) => {
                tracing::warn!("Timed out during {}", step);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    ErrorBody::new("TIMEOUT", "The request timed out, try again"),
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("INTERNAL_ERROR", "An unexpected error occurred"),
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

impl From<StepTimeout> for AppError {
    fn from(t: StepTimeout) -> Self {
        AppError::Timeout(t.0)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound("Object not found".into()),
            StorageError::InvalidKey(msg) => AppError::Validation(msg),
            StorageError::SizeLimitExceeded { limit, .. } => {
                AppError::Validation(format!("File exceeds the {limit} byte limit"))
            }
            StorageError::Timeout { operation } => AppError::Timeout(operation),
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(msg) => AppError::Validation(msg),
            IngestError::AccountDeleted => AppError::PermissionDenied,
            IngestError::QuotaExceeded(usage) => AppError::QuotaExceeded(usage),
            IngestError::Storage(e) => AppError::from(e),
            IngestError::Duplicate { existing_id } => AppError::Duplicate { existing_id },
            IngestError::Persistence(detail) => AppError::Persistence(detail),
            IngestError::Timeout(step) => AppError::Timeout(step),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::MemeNotFound(_) => AppError::NotFound("Meme not found".into()),
            LedgerError::Timeout(step) => AppError::Timeout(step),
            LedgerError::Db(e) => AppError::from(e),
        }
    }
}
