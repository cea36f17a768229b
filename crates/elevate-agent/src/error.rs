//! Error types for elevate-agent

use thiserror::Error;

/// Result type alias using elevate-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving a chat exchange
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the protocol layer
    #[error(transparent)]
    Ai(#[from] elevate_ai::Error),

    /// A send was started while another is still streaming
    #[error("A message is already being sent")]
    SendInFlight,

    /// Title generation failed
    #[error("Title generation failed: {0}")]
    Title(String),
}

impl Error {
    /// Check if this error is a timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Ai(e) => e.is_timeout(),
            _ => false,
        }
    }
}
