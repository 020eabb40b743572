//! Error types for card operations.

use thiserror::Error;

/// Result type for card operations.
pub type CardResult<T> = Result<T, CardError>;

/// Errors that can occur while manipulating or validating cards.
#[derive(Debug, Error)]
pub enum CardError {
    /// Another saved card already uses this name (case-insensitive, trimmed).
    #[error("A card named \"{name}\" already exists. Please use a unique name.")]
    NameCollision {
        /// The name that collided, as typed by the user.
        name: String,
    },

    /// A persisted card snapshot could not be decoded.
    #[error("Invalid card snapshot: {0}")]
    InvalidSnapshot(String),

    /// Card serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
