//! Typed error type for the remote crate.

use thiserror::Error;

/// Errors raised while talking to the automation platform.
///
/// Every variant is a transport-level failure: the engine never tries to
/// recover from one, it aborts the whole tool call.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("workflow not found: {0}")]
    NotFound(String),

    #[error("unauthorized: the API key was rejected")]
    Unauthorized,

    /// The platform answered with a non-success status other than 401/403/404.
    #[error("request rejected by remote ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// Only produced by [`crate::mock::MockStore`] when told to fail.
    #[error("remote unavailable: {0}")]
    Unavailable(String),
}
