use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::certifications::files::FileStoreError;
use crate::certifications::pipeline::SubmissionError;
use crate::db::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Storage(#[from] FileStoreError),
}

impl From<SubmissionError> for AppError {
    fn from(e: SubmissionError) -> Self {
        match e {
            SubmissionError::Analysis(e) => AppError::Analysis(e),
            SubmissionError::Store(e) => AppError::Store(e),
            SubmissionError::Storage(e) => AppError::Storage(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg.clone())
            }
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::Analysis(AnalysisError::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Analysis(AnalysisError::Preprocess(e)) => {
                tracing::warn!("Unprocessable certificate: {e}");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "UNPROCESSABLE_DOCUMENT",
                    e.to_string(),
                )
            }
            AppError::Analysis(AnalysisError::Extraction(e)) => {
                // The raw completion stays in the logs; clients get a generic message.
                tracing::error!(
                    "Certificate analysis failed: {e}; last response: {:?}",
                    e.last_raw
                );
                (
                    StatusCode::BAD_GATEWAY,
                    "AI_RESPONSE_ERROR",
                    "The AI service could not analyse this certificate".to_string(),
                )
            }
            AppError::Analysis(AnalysisError::InvalidAiResponse(msg)) => {
                tracing::error!("AI response failed shape check: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "AI_RESPONSE_ERROR",
                    "The AI service returned an invalid analysis".to_string(),
                )
            }
            AppError::Store(StoreError::UserNotFound(id)) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("User {id} not found"),
            ),
            AppError::Store(StoreError::Database(e)) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
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
