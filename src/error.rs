//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Only `InvalidArgument`
//! and `Init` ever leave a backend; the other variants are recovered inside
//! the backends as misses or used by the HTTP layer.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Malformed section/key, missing value or non-positive TTL
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Stored hash does not match the payload, or the envelope is malformed
    #[error("Integrity check failed: {0}")]
    Integrity(String),

    /// Entry TTL has elapsed
    #[error("Entry expired: {0}")]
    Expired(String),

    /// Filesystem failure in steady state
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend resources could not be created at construction
    #[error("Failed to initialize cache at {path}: {source}")]
    Init {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key not found in cache (HTTP layer)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Shorthand for building an `InvalidArgument` error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        CacheError::InvalidArgument(msg.into())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::NotFound(_) | CacheError::Expired(_) => StatusCode::NOT_FOUND,
            CacheError::Integrity(_)
            | CacheError::Io(_)
            | CacheError::Init { .. }
            | CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_maps_to_bad_request() {
        let response = CacheError::invalid("bad section").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = CacheError::NotFound("users/42".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_error_body_carries_message() {
        let response = CacheError::NotFound("users/42".to_string()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["error"], "Key not found: users/42");
    }

    #[test]
    fn test_init_error_message_names_path() {
        let err = CacheError::Init {
            path: PathBuf::from("/nowhere"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/nowhere"));
    }
}
