use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// One variant per pipeline stage that can fail, plus the request-level
/// validation and lookup errors. Underlying causes stay inside the variant
/// and are logged; clients only ever see the generic message.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    Validation(String),

    #[error("Staging I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Transcription error: {0}")]
    Transcription(anyhow::Error),

    #[error("Transcript persistence error: {0}")]
    Persistence(anyhow::Error),

    #[error("Not Found: {0}")]
    NotFound(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Io(_)
            | AppError::Storage(_)
            | AppError::Transcription(_)
            | AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message surfaced to clients. Internal failures collapse to the
    /// fixed per-stage messages; validation and lookup errors pass through.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Io(_) => "Error saving uploaded file".to_string(),
            AppError::Storage(_) => "Error uploading file to Google Cloud Storage".to_string(),
            AppError::Transcription(_) => "Error during transcription".to_string(),
            AppError::Persistence(_) => "Error saving or uploading transcriptions".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({
            "message": self.user_message()
        }));

        (status, body).into_response()
    }
}
