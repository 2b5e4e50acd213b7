//! Box-by-box event builder.

use common::{AggregateId, TenantId, UserId};
use serde_json::Value;

use crate::data::EventData;
use crate::envelope::EventEnvelope;

/// Convenience builder for assembling an event payload field-by-field
/// before flattening it into the generic [`EventEnvelope`].
///
/// The typed per-family constructors in the `domain` crate go through this
/// builder; the registry only ever sees the generic envelope it produces.
#[derive(Debug, Clone)]
pub struct BaseEvent {
    aggregate_id: AggregateId,
    aggregate_type: String,
    event_type: String,
    tenant_id: TenantId,
    user_id: UserId,
    data: EventData,
}

impl BaseEvent {
    /// Starts a new event for the given aggregate.
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Self {
        Self {
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event_type.into(),
            tenant_id,
            user_id,
            data: EventData::new(),
        }
    }

    /// Adds one payload field, returning the builder for chaining.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key, value);
        self
    }

    /// Replaces the whole payload.
    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = data;
        self
    }

    /// Flattens the builder into a generic envelope.
    pub fn into_envelope(self) -> EventEnvelope {
        EventEnvelope::new(
            self.aggregate_id,
            self.aggregate_type,
            self.event_type,
            self.tenant_id,
            self.user_id,
            self.data,
        )
    }
}
