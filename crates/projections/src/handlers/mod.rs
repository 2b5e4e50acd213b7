//! Aggregate projection handler families.
//!
//! Each family owns the shape of its Summary and Detail rows, folds its
//! aggregate's events into them through filter+patch updates, and
//! invalidates the family's cache keys after every successful mutation.

pub mod client;
pub mod document;
pub mod invoice;
pub mod payment;
pub mod warehouse;

pub use client::ClientProjection;
pub use document::DocumentProjection;
pub use invoice::InvoiceProjection;
pub use payment::PaymentProjection;
pub use warehouse::WarehouseProjection;

use events::EventEnvelope;
use serde_json::{Value, json};

use crate::error::ProjectionError;
use crate::store::{Filter, UpdateDocument};

/// Version-gated filter for the envelope's own aggregate row.
pub(crate) fn gated_filter(envelope: &EventEnvelope) -> Filter {
    Filter::gated(
        envelope.aggregate_id.clone(),
        envelope.tenant_id.clone(),
        envelope.version,
    )
}

/// Stamps a mutation with `updatedAt` and advances the row's
/// `lastAppliedVersion` to the envelope's version.
pub(crate) fn stamped(update: UpdateDocument, envelope: &EventEnvelope) -> UpdateDocument {
    update
        .set("updatedAt", json!(envelope.timestamp))
        .set("lastAppliedVersion", json!(envelope.version))
}

/// Turns a freshly built row into a gated upsert patch.
///
/// Create events go through the same version gate as every other
/// mutation: the first delivery upserts the row, a redelivery matches
/// nothing once `lastAppliedVersion` has advanced, so it cannot reset a
/// row that later events have already progressed.
pub(crate) fn created_row(row: Value) -> crate::Result<UpdateDocument> {
    let Value::Object(fields) = row else {
        return Err(ProjectionError::Store("row is not an object".to_string()));
    };
    let mut update = UpdateDocument::new().upsert();
    for (field, value) in fields {
        update = update.set(field, value);
    }
    Ok(update)
}
