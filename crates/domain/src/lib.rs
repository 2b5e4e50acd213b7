//! Aggregate families and their typed event constructors.
//!
//! Each family module defines:
//! - the domain structs the command side works with
//! - one small payload struct per event name (decoded once at the handler
//!   boundary, serde defaults standing in for absent fields)
//! - event type string constants and factory functions that flatten a
//!   domain object into the generic [`events::EventEnvelope`]
//!
//! There is no behavioral specialization per event beyond payload shaping,
//! so events are plain constructor functions rather than a type hierarchy.

pub mod client;
pub mod document;
pub mod invoice;
pub mod payment;
pub mod warehouse;
