//! Event-driven projection engine: the dispatch registry and the
//! per-aggregate handlers that fold envelopes into read-model rows.
//!
//! - [`HandlerRegistry`] routes envelopes to every handler registered for
//!   their event type, isolating handler failures from each other
//! - [`EventHandler`] is the seam each projection implements
//! - [`ReadModelStore`] and [`Cache`] are the external collaborator
//!   contracts the handlers write through, with in-memory doubles for tests
//! - [`replay`] rebuilds read models by driving a stream of historical
//!   envelopes through the registry
//! - `handlers::*` are the five aggregate projection families

pub mod cache;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod memory;
pub mod read_model;
pub mod registry;
pub mod replay;
pub mod store;

pub use cache::{Cache, InMemoryCache};
pub use error::{ProjectionError, Result};
pub use handler::EventHandler;
pub use handlers::{
    ClientProjection, DocumentProjection, InvoiceProjection, PaymentProjection,
    WarehouseProjection,
};
pub use memory::InMemoryReadModelStore;
pub use read_model::ActivityEntry;
pub use registry::HandlerRegistry;
pub use replay::{ReplayReport, replay};
pub use store::{Filter, ReadModelStore, UpdateDocument};
