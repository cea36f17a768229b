//! Error types for elevate-ai

use thiserror::Error;

/// Result type alias using elevate-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the chat backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend returned a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The exchange exceeded the transport's time limit
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Response was neither an event stream nor JSON
    #[error("Unexpected content-type: {0}")]
    UnexpectedContentType(String),

    /// Response body had an unexpected shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Request could not be built from the caller's input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Attachment rejected before upload
    #[error("Attachment rejected: {0}")]
    Attachment(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Stream was aborted
    #[error("Request aborted")]
    Aborted,
}

impl Error {
    /// Create an API error from a status code and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Map a reqwest error, keeping timeouts distinguishable
    pub fn from_transport(error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            Self::Timeout(format!(
                "no complete response after {} seconds; the AI operation is taking longer than expected",
                timeout_secs
            ))
        } else {
            Self::Http(error)
        }
    }

    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout(_) => true,
            Error::Http(e) => e.is_timeout(),
            Error::Api { status, .. } => *status == 408 || *status == 504,
            _ => false,
        }
    }
}
