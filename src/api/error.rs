//! REST client error types

use crate::core::models::{ServerErrorEntry, ValidationError};
use thiserror::Error;

/// Result alias for REST calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Error types for REST operations
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with an unexpected status code
    #[error("{method} {url} returned HTTP {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
        errors: Vec<ServerErrorEntry>,
    },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check whether the server's error payload (or raw body) mentions `phrase`
    pub fn mentions(&self, phrase: &str) -> bool {
        match self {
            ApiError::Status { errors, body, .. } => {
                errors.iter().any(|e| e.mentions(phrase)) || body.contains(phrase)
            }
            _ => false,
        }
    }

    /// Errors that mean the server could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::Transport { .. } | ApiError::Timeout(_))
            || matches!(self.status(), Some(502..=504))
    }
}
