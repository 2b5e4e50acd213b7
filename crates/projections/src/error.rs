//! Projection error types.

use thiserror::Error;

/// Errors that can occur while projecting an event.
///
/// Store and cache failures are retryable from the caller's point of view;
/// a payload decode failure is not, since redelivering the same bytes
/// cannot succeed.
#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The read model store rejected a write or was unavailable.
    #[error("Read model store error: {0}")]
    Store(String),

    /// The cache rejected an invalidation or was unavailable.
    #[error("Cache error: {0}")]
    Cache(String),

    /// An event payload could not be decoded into its schema.
    #[error("Event payload decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The envelope itself was malformed.
    #[error("Envelope error: {0}")]
    Envelope(#[from] events::EnvelopeError),
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;
