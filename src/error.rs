use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("File too large: max {0}MB allowed")]
    FileTooLarge(u64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Transcription service error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::UnsupportedMediaType(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::FileTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Validation(msg) => {
                tracing::warn!("Validation error: {}", msg);
                msg.clone()
            }
            AppError::UnsupportedMediaType(content_type) => {
                tracing::warn!("Rejected non-audio upload: {}", content_type);
                format!(
                    "Unsupported file type '{}': only audio files are accepted",
                    content_type
                )
            }
            AppError::FileTooLarge(max) => format!("File too large: max {}MB allowed", max),
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                "Failed to save file".to_string()
            }
            AppError::Upstream(msg) => {
                tracing::error!("Transcription service error: {}", msg);
                msg.clone()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
        };

        (
            status,
            Json(json!({ "success": false, "error": message })),
        )
            .into_response()
    }
}
