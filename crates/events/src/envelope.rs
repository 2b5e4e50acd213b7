//! The canonical event envelope.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{AggregateId, TenantId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::EventData;
use crate::error::{EnvelopeError, Result};

/// Canonical, serializable unit of state change.
///
/// Immutable once published: the fluent `with_*` setters exist for the
/// producer building the envelope, not for consumers. Field names on the
/// wire are fixed (camelCase) for interop with existing producers and
/// consumers; `to_json`/`from_json` round-trip every field losslessly,
/// including heterogeneous nested `data` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Unique event identifier, also the deduplication key.
    pub id: String,

    /// Dot-scoped event type, e.g. `invoice.created`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// The aggregate this event belongs to.
    pub aggregate_id: AggregateId,

    /// The aggregate family, e.g. `Invoice`.
    pub aggregate_type: String,

    /// Tenant isolation boundary; propagated unchanged into every derived row.
    pub tenant_id: TenantId,

    /// Aggregate revision after this event.
    pub version: i64,

    /// When the event occurred (UTC).
    pub timestamp: DateTime<Utc>,

    /// Groups events belonging to one causal chain.
    pub correlation_id: String,

    /// The envelope that triggered this one, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,

    /// The acting user.
    pub user_id: UserId,

    /// Event-specific payload.
    #[serde(default)]
    pub data: EventData,

    /// Free-form string tags.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl EventEnvelope {
    /// Creates an envelope with a fresh event ID, a fresh correlation ID,
    /// version 1, and the current UTC timestamp.
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        tenant_id: TenantId,
        user_id: UserId,
        data: EventData,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            tenant_id,
            version: 1,
            timestamp: Utc::now(),
            correlation_id: Uuid::new_v4().to_string(),
            causation_id: None,
            user_id,
            data,
            metadata: HashMap::new(),
        }
    }

    /// Sets the correlation ID, linking this envelope into an existing chain.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Sets the causation ID to the envelope that triggered this one.
    pub fn with_causation_id(mut self, causation_id: impl Into<String>) -> Self {
        self.causation_id = Some(causation_id.into());
        self
    }

    /// Adds a metadata tag.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Sets the aggregate revision.
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// Advances the aggregate revision by one.
    pub fn increment_version(&mut self) {
        self.version += 1;
    }

    /// Routing key used by the transport to route and filter envelopes
    /// without inspecting the payload: `evt.<AggregateType>.<Type>`.
    pub fn subject(&self) -> String {
        format!("evt.{}.{}", self.aggregate_type, self.event_type)
    }

    /// Serializes the envelope to its JSON wire form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserializes an envelope from its JSON wire form.
    ///
    /// Rejects envelopes without a tenant ID: no derived row may exist
    /// outside a tenant boundary.
    pub fn from_json(json: &str) -> Result<Self> {
        let envelope: Self = serde_json::from_str(json)?;
        if envelope.tenant_id.is_empty() {
            return Err(EnvelopeError::MissingTenant {
                event_id: envelope.id,
                event_type: envelope.event_type,
            });
        }
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_envelope() -> EventEnvelope {
        let mut data = EventData::new();
        data.insert("invoiceNumber", json!("INV-001"));
        data.insert("total", json!("100.00"));
        data.insert("lines", json!([{"id": "L1", "qty": 2}]));
        data.insert("shipping", json!({"city": "Lima", "zip": 15001}));

        EventEnvelope::new(
            AggregateId::new("inv-1"),
            "Invoice",
            "invoice.created",
            TenantId::new("tenant-a"),
            UserId::new("user-1"),
            data,
        )
    }

    #[test]
    fn new_seeds_fresh_ids_and_version_one() {
        let e1 = sample_envelope();
        let e2 = sample_envelope();
        assert_ne!(e1.id, e2.id);
        assert_ne!(e1.correlation_id, e2.correlation_id);
        assert_eq!(e1.version, 1);
        assert!(e1.causation_id.is_none());
    }

    #[test]
    fn fluent_setters_chain() {
        let envelope = sample_envelope()
            .with_correlation_id("corr-1")
            .with_causation_id("cause-1")
            .with_metadata("source", "api")
            .with_version(4);

        assert_eq!(envelope.correlation_id, "corr-1");
        assert_eq!(envelope.causation_id.as_deref(), Some("cause-1"));
        assert_eq!(envelope.metadata.get("source").unwrap(), "api");
        assert_eq!(envelope.version, 4);
    }

    #[test]
    fn increment_version_advances_by_one() {
        let mut envelope = sample_envelope();
        envelope.increment_version();
        envelope.increment_version();
        assert_eq!(envelope.version, 3);
    }

    #[test]
    fn subject_formatting() {
        let envelope = EventEnvelope::new(
            AggregateId::new("wh-1"),
            "Warehouse",
            "created",
            TenantId::new("tenant-a"),
            UserId::new("user-1"),
            EventData::new(),
        );
        assert_eq!(envelope.subject(), "evt.Warehouse.created");
    }

    #[test]
    fn json_roundtrip_is_lossless() {
        let envelope = sample_envelope()
            .with_causation_id("cause-1")
            .with_metadata("source", "api");

        let json = envelope.to_json().unwrap();
        let back = EventEnvelope::from_json(&json).unwrap();
        assert_eq!(back, envelope);
    }

    #[test]
    fn wire_field_names_are_exact() {
        let envelope = sample_envelope();
        let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        for field in [
            "id",
            "type",
            "aggregateId",
            "aggregateType",
            "tenantId",
            "version",
            "timestamp",
            "correlationId",
            "userId",
            "data",
        ] {
            assert!(value.get(field).is_some(), "missing wire field {field}");
        }
        assert_eq!(value["type"], json!("invoice.created"));
        assert_eq!(value["data"]["shipping"]["zip"], json!(15001));
    }

    #[test]
    fn from_json_rejects_missing_tenant() {
        let mut value: serde_json::Value =
            serde_json::from_str(&sample_envelope().to_json().unwrap()).unwrap();
        value["tenantId"] = json!("");

        let err = EventEnvelope::from_json(&value.to_string()).unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingTenant { .. }));
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        let err = EventEnvelope::from_json("{not json").unwrap_err();
        assert!(matches!(err, EnvelopeError::Serialization(_)));
    }
}
