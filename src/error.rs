//! Error taxonomy surfaced by every request handler.
//!
//! Each variant maps to one HTTP status and renders as `{"detail": "..."}`,
//! with the underlying cause embedded in the message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::gateway::InferenceError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Required input was missing or malformed.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// The request body exceeded the configured upload limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// The uploaded file could not be turned into text.
    #[error("Error processing PDF: {0}")]
    Extraction(String),

    #[error("Ollama error: {0}")]
    Inference(InferenceError),

    #[error("An unexpected error occurred: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Extraction(_) | AppError::Inference(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<InferenceError> for AppError {
    fn from(value: InferenceError) -> Self {
        match value {
            // A crashed worker is our fault, not the engine's.
            InferenceError::Task(err) => AppError::Internal(format!("inference task failed: {err}")),
            other => AppError::Inference(other),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::Internal(format!("{value:#}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            tracing::error!(status = %status, "{message}");
        } else {
            tracing::warn!(status = %status, "{message}");
        }
        (status, Json(json!({ "detail": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(
            AppError::Validation("No file uploaded".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("Session not found".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::PayloadTooLarge("upload too large".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::Extraction("bad xref".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(InferenceError::Timeout(Duration::from_secs(1))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_embed_the_cause() {
        let err = AppError::Extraction("invalid file header".into());
        assert_eq!(err.to_string(), "Error processing PDF: invalid file header");

        let err = AppError::from(InferenceError::Engine(anyhow::anyhow!("connection refused")));
        assert_eq!(err.to_string(), "Ollama error: connection refused");
    }

    #[tokio::test]
    async fn panicked_worker_is_internal() {
        let join_err = tokio::spawn(async { panic!("boom") }).await.unwrap_err();
        let err = AppError::from(InferenceError::Task(join_err));

        assert!(matches!(err, AppError::Internal(_)));
        assert!(err
            .to_string()
            .starts_with("An unexpected error occurred: inference task failed"));
    }
}
