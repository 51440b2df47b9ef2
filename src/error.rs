//! Error types for the enrollment backend
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Queue Error Enum ==
/// Failure modes of a task submitted to a [`crate::queue::TaskQueue`].
///
/// `E` is the error type of the submitted operation itself and is carried
/// through untouched in [`QueueError::Operation`].
#[derive(Error, Debug)]
pub enum QueueError<E> {
    /// Admission rejected: the pending queue is at capacity
    #[error("Queue full: {limit} tasks already pending")]
    QueueFull { limit: usize },

    /// Deadline elapsed before the operation started or finished
    #[error("Operation timed out after {timeout_ms}ms")]
    OperationTimeout { timeout_ms: u64 },

    /// The queue no longer accepts work
    #[error("Queue is shutting down")]
    ShuttingDown,

    /// The task was dropped without producing a result
    #[error("Task was dropped before producing a result")]
    Cancelled,

    /// The operation's own failure
    #[error(transparent)]
    Operation(E),
}

impl<E> QueueError<E> {
    /// Returns true if the error signals overload rather than a failed operation.
    pub fn is_backpressure(&self) -> bool {
        matches!(self, QueueError::QueueFull { .. } | QueueError::ShuttingDown)
    }
}

// == Repository Error Enum ==
/// Errors produced by the data-access layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    /// Record or resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload rejected by the store
    #[error("Invalid payload: {0}")]
    Invalid(String),

    /// Unexpected storage failure
    #[error("Storage error: {0}")]
    Storage(String),
}

// == API Error Enum ==
/// Unified error type for the HTTP layer.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Resource or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Server is overloaded, retry later
    #[error("Service overloaded: {0}")]
    Overloaded(String),

    /// Data access did not finish in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => ApiError::NotFound(msg),
            RepoError::Invalid(msg) => ApiError::InvalidRequest(msg),
            RepoError::Storage(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<QueueError<RepoError>> for ApiError {
    fn from(err: QueueError<RepoError>) -> Self {
        let message = err.to_string();
        match err {
            QueueError::QueueFull { .. } | QueueError::ShuttingDown => {
                ApiError::Overloaded(message)
            }
            QueueError::OperationTimeout { .. } => ApiError::Timeout(message),
            QueueError::Cancelled => ApiError::Internal(message),
            QueueError::Operation(inner) => inner.into(),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Overloaded(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::Timeout(msg) => (StatusCode::REQUEST_TIMEOUT, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
