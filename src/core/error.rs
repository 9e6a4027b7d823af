use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::modules::storage::StorageError;
use crate::shared::types::MessageResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Every failure is reported as a plain message with a 200 status; the kind
/// only affects how loudly it is logged.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::BadRequest(msg) => tracing::warn!("Bad request: {}", msg),
            AppError::Storage(StorageError::NotFound(key)) => {
                tracing::warn!("Object not found: {}", key)
            }
            AppError::Storage(e) => tracing::error!("Storage error: {}", e),
            AppError::Internal(msg) => tracing::error!("Internal error: {}", msg),
        }

        let body = Json(MessageResponse::new(format!("An error occurred: {}", self)));

        (StatusCode::OK, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
