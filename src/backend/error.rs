//! Error types for the extraction backend client.
//!
//! [`ApiError`] separates the cases the session cares about: the backend
//! answered with an explicit `{error}` body, answered with an unexpected
//! HTTP status, answered with something unparseable, or could not be
//! reached at all.

use thiserror::Error;

/// Errors that can occur while talking to the extraction backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend answered with an `{"error": "..."}` body.
    #[error("{0}")]
    Rejected(String),

    /// Non-success HTTP status without a recognisable error body.
    #[error("HTTP error (status {status}): {message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The configured server URL or a derived endpoint is not a valid URL.
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    /// Underlying network failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}
