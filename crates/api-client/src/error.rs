//! Error types for API calls and session refresh

use std::time::Duration;

use reqwest::StatusCode;

/// Outcome of a failed refresh, handed to the leader and every queued request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Session(#[from] session::Error),

    #[error("refresh abandoned before it settled")]
    Abandoned,

    #[error("gave up waiting for token refresh after {}ms", .0.as_millis())]
    QueueTimeout(Duration),
}

/// Errors surfaced to callers of `ApiClient`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Any non-2xx response that was not recovered by a refresh, including
    /// anonymous and repeated 401s.
    #[error("request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("session refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    #[error("request body could not be encoded: {0}")]
    Encode(String),

    #[error("response could not be decoded: {0}")]
    Decode(String),

    #[error("token store error: {0}")]
    Store(#[from] session::Error),
}

impl ApiError {
    /// HTTP status for `Status` errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ApiError>;
