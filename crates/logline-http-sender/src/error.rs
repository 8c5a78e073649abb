//! HTTP sender error types.

use thiserror::Error;

/// HTTP sender error type.
#[derive(Error, Debug)]
pub enum HttpSenderError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request body encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias using HttpSenderError.
pub type HttpSenderResult<T> = Result<T, HttpSenderError>;
