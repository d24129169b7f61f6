//! Error types for the session client.

use crate::storage::StorageError;
use thiserror::Error;

/// Errors returned by controller, remote and account operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected before any network call.
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),
    /// The backend answered but reported a failure.
    #[error("{0}")]
    Service(String),
    /// The request never produced a usable response.
    #[error("transport error: {0}")]
    Transport(String),
    /// The response body did not match the expected shape.
    #[error("malformed response from {endpoint}: {detail}")]
    MalformedResponse { endpoint: String, detail: String },
    /// Local store failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
