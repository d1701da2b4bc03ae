//! Client Error Types
//!
//! This module defines the errors that can occur while talking to the review
//! service or touching persisted client state.

/// Error types for client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (connection refused, DNS, TLS)
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Session token missing, invalid or expired
    #[error("Not authenticated: please log in again")]
    Unauthorized,

    /// Server answered with a non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Server answered 2xx but reported `success: false`
    #[error("Server rejected request: {0}")]
    Api(String),

    /// Response body did not match the expected shape
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Caller passed a value the service would reject
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persisted client state could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// Whether this error means the local session must be discarded
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, ClientError>;
