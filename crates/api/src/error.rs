//! API and server error types

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::settings::SettingsError;

/// Errors surfaced to HTTP callers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request, rejected before the pipeline runs
    #[error("{0}")]
    Validation(String),

    /// Optional collaborator is not configured
    #[error("{error}: {message}")]
    Unavailable { error: String, message: String },

    /// Collaborator is configured but failed
    #[error("{error}: {message}")]
    Backend { error: String, message: String },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn unavailable(error: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Unavailable {
            error: error.into(),
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::Unavailable { error, message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": error, "message": message })),
            )
                .into_response(),
            ApiError::Backend { error, message } => {
                error!("{}: {}", error, message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": error, "message": message })),
                )
                    .into_response()
            }
            ApiError::Internal(message) => {
                error!("Error processing request: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error", "message": message })),
                )
                    .into_response()
            }
        }
    }
}

/// Startup and serve failures
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Invalid alert policy: {0}")]
    Policy(#[from] alerting::ConfigError),

    #[error("Failed to build push client: {0}")]
    Client(#[from] alerting::SendError),

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}
