//! Error types for the RAG service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Text extraction failed for a single file
    #[error("Failed to parse file '{path}': {message}")]
    FileParse { path: String, message: String },

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Persisted index is missing, corrupt or built for another embedding space
    #[error("Failed to load vector index: {0}")]
    IndexLoad(String),

    /// Writing the index to disk failed
    #[error("Failed to persist vector index: {0}")]
    IndexPersist(String),

    /// Invalid request parameters
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file parse error
    pub fn file_parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an index load error
    pub fn index_load(message: impl Into<String>) -> Self {
        Self::IndexLoad(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Failure reasons of a language-model backend call.
///
/// The answer composer maps every variant to the "I don't know." sentinel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The call exceeded its time budget
    #[error("backend request timed out")]
    Timeout,

    /// Transport failure or non-success status from the provider
    #[error("backend provider error: {0}")]
    Provider(String),

    /// The provider answered with a body we could not interpret
    #[error("malformed backend response: {0}")]
    Malformed(String),

    /// The provider answered with no text
    #[error("backend returned an empty response")]
    EmptyResponse,
}

impl BackendError {
    /// Whether a retry has a chance of succeeding
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Provider(err.to_string())
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::FileParse { path, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "parse_error",
                format!("Failed to parse '{}': {}", path, message),
            ),
            Error::Embedding(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error", msg.clone())
            }
            Error::IndexLoad(msg) | Error::IndexPersist(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "index_error", msg.clone())
            }
            Error::Validation(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error", msg.clone())
            }
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::INTERNAL_SERVER_ERROR, "json_error", err.to_string()),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_422() {
        let response = Error::validation("question must not be empty").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_only_provider_errors_are_retryable() {
        assert!(BackendError::Provider("502".to_string()).is_retryable());
        assert!(!BackendError::Timeout.is_retryable());
        assert!(!BackendError::EmptyResponse.is_retryable());
        assert!(!BackendError::Malformed("not json".to_string()).is_retryable());
    }
}
