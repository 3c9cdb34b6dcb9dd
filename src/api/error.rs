//! API Error Types
//!
//! Error classification for the platform API client: transport failures,
//! server-reported errors, and the terminal session-expired state reached
//! when the silent token refresh fails.

use thiserror::Error;

use crate::session::StoreError;

/// Errors surfaced by the API client and the services built on it
#[derive(Error, Debug)]
pub enum ApiError {
    /// Underlying transport failure
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Request timed out
    #[error("Request timeout")]
    Timeout,

    /// Server unreachable
    #[error("Platform API unavailable")]
    Unavailable,

    /// Non-2xx response; message extracted from the response body when present
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Token refresh failed; all local session state has been cleared
    #[error("Session expired, sign in again")]
    SessionExpired,

    /// Operation requires a signed-in user
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Rejected client-side before submission
    #[error("Validation error: {0}")]
    Validation(String),

    /// A 2xx response did not carry the expected payload
    #[error("Unexpected response shape: {0}")]
    UnexpectedResponse(String),

    /// Session store failure
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Classify a transport error the way the rest of the crate reports it.
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_connect() {
            ApiError::Unavailable
        } else {
            ApiError::Request(e)
        }
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
