//! Canonical event envelope for the projection engine.
//!
//! This crate defines the transport-agnostic unit of state change:
//! - [`EventEnvelope`] is the serializable envelope every producer
//!   publishes and every projection handler consumes
//! - [`EventData`] is the open payload map with never-panicking field
//!   accessors
//! - [`BaseEvent`] is a convenience builder for assembling an event
//!   field-by-field before flattening it into the generic envelope

pub mod base;
pub mod data;
pub mod envelope;
pub mod error;

pub use base::BaseEvent;
pub use data::EventData;
pub use envelope::EventEnvelope;
pub use error::{EnvelopeError, Result};
