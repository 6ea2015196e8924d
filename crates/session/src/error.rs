//! Error types for token storage and refresh

use std::time::Duration;

/// Errors from token storage and the refresh endpoint.
///
/// `Clone` so one refresh outcome can be handed to every queued caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token refresh timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("refresh rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid token response: {0}")]
    InvalidResponse(String),

    #[error("no refresh token available")]
    MissingRefreshToken,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("cookie jar parse error: {0}")]
    CookieParse(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
