//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::{AdjustmentError, DomainError};
use crate::event_store::StoreError;
use crate::projection::ProjectionError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Version conflict: concurrent modification detected")]
    VersionConflict,

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<AdjustmentError> for AppError {
    fn from(err: AdjustmentError) -> Self {
        AppError::InvalidRequest(err.to_string())
    }
}

impl AppError {
    /// Stable rejection reason reported to callers
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::UserAlreadyExists(_) => "user_already_exists",
            AppError::UserNotFound(_) => "user_not_found",
            AppError::VersionConflict => "version_conflict",
            AppError::Domain(err) => match err {
                DomainError::Validation(_) => "invalid_request",
                DomainError::NotFound(_) => "not_found",
            },
            AppError::Projection(ProjectionError::Store(_)) => "store_error",
            AppError::Projection(_) => "sequence_violation",
            AppError::Store(StoreError::ConcurrencyConflict { .. }) => "version_conflict",
            AppError::Store(_) => "store_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UserAlreadyExists(_) | AppError::VersionConflict => StatusCode::CONFLICT,
            AppError::UserNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Domain(err) => match err {
                DomainError::Validation(_) => StatusCode::BAD_REQUEST,
                DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            },
            AppError::Store(StoreError::ConcurrencyConflict { .. }) => StatusCode::CONFLICT,
            AppError::Projection(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Lost an optimistic-concurrency race; re-running with fresh state may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AppError::VersionConflict | AppError::Store(StoreError::ConcurrencyConflict { .. })
        )
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Server-side failures are logged here; details stay out of the body
        let details = if status.is_server_error() {
            tracing::error!(error = ?self, error_code = self.error_code(), "Request failed");
            None
        } else {
            match &self {
                AppError::InvalidRequest(msg)
                | AppError::UserAlreadyExists(msg)
                | AppError::UserNotFound(msg) => Some(msg.clone()),
                AppError::Domain(err) => Some(err.to_string()),
                _ => None,
            }
        };

        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: self.error_code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
