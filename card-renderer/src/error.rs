//! Export error types.

use thiserror::Error;

/// Result type for export operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during export.
#[derive(Debug, Error)]
pub enum RenderError {
    /// There was no render tree to capture.
    #[error("Export capture failed: card element not found")]
    MissingTarget,

    /// The render tree could not be turned into an image.
    #[error("Export capture failed: {0}")]
    Capture(String),

    /// The finished image could not be handed to the sink.
    #[error("Export delivery failed: {0}")]
    Delivery(String),

    /// Another export is already running.
    #[error("An export is already in progress")]
    Busy,

    /// A remote or embedded resource could not be loaded.
    #[error("Failed to load resource: {0}")]
    Resource(String),

    /// HTTP client construction failed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A configured URL is malformed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl RenderError {
    /// Whether this is a capture-stage failure.
    #[must_use]
    pub fn is_capture(&self) -> bool {
        matches!(self, Self::Capture(_) | Self::MissingTarget)
    }

    /// Whether this is a delivery-stage failure.
    #[must_use]
    pub fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }
}
