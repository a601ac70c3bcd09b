//! Alerting Error Types

use thiserror::Error;

/// Errors from the outbound push call
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// No response within the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Connection, TLS, or request construction failure
    #[error("Request failed: {0}")]
    Request(String),

    /// Endpoint answered with a non-2xx status
    #[error("Push endpoint returned HTTP {code}: {body}")]
    Status { code: u16, body: String },
}

impl From<reqwest::Error> for SendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SendError::Timeout
        } else {
            SendError::Request(err.to_string())
        }
    }
}

/// Invalid alert policy values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be an hour between 0 and 23, got {value}")]
    InvalidHour { field: &'static str, value: u32 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}
