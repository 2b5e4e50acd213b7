//! Envelope error types.

use thiserror::Error;

/// Errors that can occur when encoding or decoding an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The envelope could not be serialized or deserialized.
    ///
    /// A decode failure is fatal for the envelope in question: the bytes do
    /// not describe a well-formed event and redelivery will not change that.
    #[error("Envelope serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The envelope carried no tenant ID.
    ///
    /// Tenant ID is the isolation boundary for every derived row, so an
    /// envelope without one must never reach a projection handler.
    #[error("Envelope {event_id} ({event_type}) has no tenant ID")]
    MissingTenant {
        event_id: String,
        event_type: String,
    },
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
