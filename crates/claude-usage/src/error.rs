//! Error types for the claude-usage crate.

use thiserror::Error;

/// Errors that can occur when calling the usage API.
///
/// The `Display` strings double as the user-facing status messages, so keep
/// them short enough to fit in a status line.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiError {
    /// The session key was rejected (HTTP 401 or 403).
    #[error("Auth failed")]
    Unauthorized,

    /// The server answered with any other non-success status.
    #[error("HTTP {0}")]
    Http(u16),

    /// The request never produced a response (DNS, TLS, connection reset).
    #[error("Network error: {0}")]
    Network(String),

    /// The body was not JSON or did not carry numeric utilization values.
    #[error("Invalid usage data format")]
    InvalidFormat,
}

impl ApiError {
    /// Returns `true` for errors caused by bad or expired credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}
