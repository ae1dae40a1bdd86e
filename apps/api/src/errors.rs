use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::chat::error::ChatError;
use crate::db::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Database(#[from] StoreError),

    #[error("Database timed out after {0:?}")]
    DatabaseTimeout(Duration),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM timed out after {0:?}")]
    LlmTimeout(Duration),

    #[error("S3 error: {0}")]
    S3(String),
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::ExtractionService(msg) => AppError::Llm(msg),
            ChatError::ServiceTimeout(d) => AppError::LlmTimeout(d),
            ChatError::UnknownIntent(category) => {
                AppError::Llm(format!("unknown request type '{category}'"))
            }
            ChatError::UnsupportedFormat(msg) => AppError::Validation(msg),
            ChatError::NotFound(msg) => AppError::NotFound(msg),
            ChatError::Repository(e) => AppError::Database(e),
            ChatError::RepositoryTimeout(d) => AppError::DatabaseTimeout(d),
            ChatError::ImageStorage(msg) => AppError::S3(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::DatabaseTimeout(d) => {
                tracing::error!("Database timed out after {d:?}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "DATABASE_TIMEOUT",
                    "The database did not respond in time".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::LlmTimeout(d) => {
                tracing::error!("LLM timed out after {d:?}");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "LLM_TIMEOUT",
                    "The AI service did not respond in time".to_string(),
                )
            }
            AppError::S3(msg) => {
                tracing::error!("S3 error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "S3_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
