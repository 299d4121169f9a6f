//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// All errors that can occur while serving requests are represented by this enum.
/// Each variant implements automatic conversion to HTTP responses via `IntoResponse`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Job with the given ID was not found
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Agent with the given ID was not found
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    /// Download with the given ID was not found
    #[error("Download not found: {0}")]
    DownloadNotFound(String),

    /// Request body or parameters are invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Requested download format is not offered for this job
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Uploaded payload exceeds the configured limit
    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    /// Download exists but its lifetime has ended
    #[error("Download expired: {0}")]
    DownloadExpired(String),

    /// Error occurred in the SQLite store
    #[error("Persistence error: {0}")]
    Persistence(#[from] crate::state::PersistenceError),

    /// A2A message could not be delivered or handled
    #[error("Protocol error: {0}")]
    Protocol(#[from] crate::protocol::ProtocolError),

    /// Export or placeholder media generation failed
    #[error("Export error: {0}")]
    Export(#[from] crate::downloads::ExportError),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::JobNotFound(_) => StatusCode::NOT_FOUND,
            AppError::AgentNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DownloadNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::DownloadExpired(_) => StatusCode::GONE,
            AppError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Protocol(
                crate::protocol::ProtocolError::UnknownRecipient(_)
                | crate::protocol::ProtocolError::Malformed(_),
            ) => StatusCode::BAD_REQUEST,
            AppError::Protocol(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Export(crate::downloads::ExportError::Unsupported(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
