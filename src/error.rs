//! Error types for the registration flow.

use thiserror::Error;

/// Result type alias using the coleta error type.
pub type Result<T> = std::result::Result<T, ColetaError>;

/// Main error type for the registration flow.
#[derive(Error, Debug)]
pub enum ColetaError {
    /// The backend accepted the request but reported a business error. The
    /// message is the server's own text and is shown to the user verbatim.
    #[error("submission rejected: {0}")]
    SubmissionRejected(String),

    /// The current position could not be determined. Never fatal: the flow
    /// falls back to the default coordinate.
    #[error("geolocation unavailable: {0}")]
    GeolocationUnavailable(String),

    /// Transport-level failure (connection, DNS, TLS).
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// A service answered with a body this crate could not decode.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// General error from anyhow
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ColetaError {
    /// The text a UI should show for this failure.
    ///
    /// Server rejections surface the server's message as-is; everything else
    /// falls back to the error display.
    pub fn user_message(&self) -> String {
        match self {
            ColetaError::SubmissionRejected(message) => message.clone(),
            other => other.to_string(),
        }
    }
}
