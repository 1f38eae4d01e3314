//! Error types for Conduit client operations

use phab_domain::ConduitError;
use thiserror::Error;

/// Errors that can occur while talking to Conduit.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The endpoint accepted the request but rejected the call.
    #[error("conduit call rejected: {0}")]
    Conduit(#[from] ConduitError),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response did not follow the Conduit envelope contract.
    #[error("malformed conduit response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err.to_string())
    }
}

/// Result type for Conduit client operations
pub type Result<T> = std::result::Result<T, ClientError>;
