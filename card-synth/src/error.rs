//! Synthesis error types.

use thiserror::Error;

/// Result type for synthesis operations.
pub type SynthResult<T> = Result<T, SynthError>;

/// Errors that can occur while generating card content.
#[derive(Debug, Error)]
pub enum SynthError {
    /// No API credential is configured. Raised before any network call.
    #[error("API_KEY is not configured")]
    MissingCredential,

    /// Another synthesis is already running.
    #[error("A synthesis is already in progress")]
    Busy,

    /// The configured endpoint URL is malformed.
    #[error("invalid generative endpoint URL: {0}")]
    InvalidUrl(String),

    /// HTTP layer failed (connection, timeout, etc.).
    #[error("generative endpoint request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with an error status.
    #[error("generative endpoint returned {status}: {body}")]
    Endpoint {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The reply could not be turned into card fields.
    #[error("failed to parse generated content: {0}")]
    Parse(String),
}

impl SynthError {
    /// Whether the reply arrived but was unusable.
    #[must_use]
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

impl From<serde_json::Error> for SynthError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
