//! Error handling module
//!
//! `SyncError` is the engine-wide error type. `AppError` wraps it for the
//! HTTP trigger surface and maps each variant to a status code.

use crate::sync::SyncFailure;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors raised by the synchronization engine and its collaborators.
///
/// Per-proposal transport failures and timeouts never appear here directly:
/// they are collected as outcomes and only surface wrapped in
/// [`SyncError::Sync`] when the propagate policy is active.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Table facts could not be turned into proposals. Never suppressed.
    #[error("Build error: {0}")]
    Build(String),

    #[error("Table metadata error: {0}")]
    Metadata(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Sync(#[from] SyncFailure),
}

impl SyncError {
    pub fn build(msg: impl Into<String>) -> Self {
        SyncError::Build(msg.into())
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        SyncError::Metadata(msg.into())
    }
}

/// Application-wide error type for HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match &self {
            AppError::Sync(SyncError::Build(msg)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "BUILD_ERROR",
                "Table facts could not be converted into catalog proposals".to_string(),
                Some(msg.clone()),
            ),
            AppError::Sync(SyncError::Metadata(msg)) => {
                error!("Table metadata error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TABLE_METADATA_ERROR",
                    "Failed to read table metadata".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::Sync(SyncError::Config(msg)) => {
                error!("Configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR",
                    "A configuration error occurred".to_string(),
                    Some(msg.clone()),
                )
            }
            AppError::Sync(SyncError::Sync(failure)) => {
                error!("Catalog sync failed: {:?}", failure);
                (
                    StatusCode::BAD_GATEWAY,
                    "SYNC_FAILED",
                    failure.to_string(),
                    Some(failure.first.to_string()),
                )
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::NotImplemented(msg) => (
                StatusCode::NOT_IMPLEMENTED,
                "NOT_IMPLEMENTED",
                msg.clone(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error: details,
            code: Some(error_code.to_string()),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, AppError>;

/// Helper function to create a validation error
pub fn validation_error(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}
