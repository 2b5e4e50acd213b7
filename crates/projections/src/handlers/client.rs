//! Client projection, including the two-sided merge bookkeeping.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, TenantId};
use domain::client::{
    self, ClientCreated, ClientCreditLimitChanged, ClientDeactivated, ClientMerged, ClientStatus,
    ClientUpdated,
};
use events::EventEnvelope;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::Result;
use crate::cache::Cache;
use crate::handler::EventHandler;
use crate::handlers::{created_row, gated_filter, stamped};
use crate::read_model::{ActivityEntry, invalidate_entity};
use crate::registry::HandlerRegistry;
use crate::store::{Filter, ReadModelStore, UpdateDocument};

pub const SUMMARIES: &str = "client_summaries";
pub const DETAILS: &str = "client_details";
const FAMILY: &str = "client";

/// List-optimized client row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummaryRow {
    pub id: AggregateId,
    pub tenant_id: TenantId,
    pub name: String,
    pub email: String,
    pub status: ClientStatus,
    #[serde(with = "rust_decimal::serde::str")]
    pub credit_limit: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub current_balance: Decimal,
    pub last_applied_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full client view with contact details and the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetailRow {
    #[serde(flatten)]
    pub summary: ClientSummaryRow,
    #[serde(default)]
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_into: Option<String>,
    pub activity_log: Vec<ActivityEntry>,
}

/// Projects client events into the client read models.
pub struct ClientProjection {
    store: Arc<dyn ReadModelStore>,
    cache: Arc<dyn Cache>,
}

impl ClientProjection {
    pub const EVENT_TYPES: &'static [&'static str] = &[
        client::CLIENT_CREATED,
        client::CLIENT_UPDATED,
        client::CLIENT_CREDIT_LIMIT_CHANGED,
        client::CLIENT_MERGED,
        client::CLIENT_DEACTIVATED,
    ];

    pub fn new(store: Arc<dyn ReadModelStore>, cache: Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    /// Registers this projection for every client event type.
    pub fn register(self: Arc<Self>, registry: &mut HandlerRegistry) {
        registry.register_all(Self::EVENT_TYPES, self);
    }

    async fn on_created(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: ClientCreated = envelope.data.decode()?;
        let summary = ClientSummaryRow {
            id: envelope.aggregate_id.clone(),
            tenant_id: envelope.tenant_id.clone(),
            name: payload.name,
            email: payload.email,
            status: ClientStatus::Active,
            credit_limit: payload.credit_limit,
            current_balance: Decimal::ZERO,
            last_applied_version: envelope.version,
            created_at: envelope.timestamp,
            updated_at: envelope.timestamp,
        };
        let detail = ClientDetailRow {
            summary: summary.clone(),
            phone: payload.phone,
            merged_into: None,
            activity_log: vec![ActivityEntry::from_envelope(envelope, "created", "")],
        };

        self.store
            .update(
                SUMMARIES,
                gated_filter(envelope),
                created_row(serde_json::to_value(&summary)?)?,
            )
            .await?;
        self.store
            .update(
                DETAILS,
                gated_filter(envelope),
                created_row(serde_json::to_value(&detail)?)?,
            )
            .await
    }

    async fn on_updated(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: ClientUpdated = envelope.data.decode()?;

        // Empty payload fields mean "unchanged".
        let contact = |mut update: UpdateDocument| {
            if !payload.name.is_empty() {
                update = update.set("name", json!(payload.name));
            }
            if !payload.email.is_empty() {
                update = update.set("email", json!(payload.email));
            }
            update
        };

        let summary = stamped(contact(UpdateDocument::new()), envelope);
        let mut detail = contact(UpdateDocument::new());
        if !payload.phone.is_empty() {
            detail = detail.set("phone", json!(payload.phone));
        }
        let detail = stamped(
            detail.push(
                "activityLog",
                ActivityEntry::from_envelope(envelope, "updated", "").to_value()?,
            ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }

    async fn on_credit_limit_changed(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: ClientCreditLimitChanged = envelope.data.decode()?;
        let details = format!(
            "credit limit changed from {} to {}",
            payload.previous_limit, payload.new_limit
        );

        let summary = stamped(
            UpdateDocument::new().set("creditLimit", json!(payload.new_limit.to_string())),
            envelope,
        );
        let detail = stamped(
            UpdateDocument::new()
                .set("creditLimit", json!(payload.new_limit.to_string()))
                .push(
                    "activityLog",
                    ActivityEntry::from_envelope(envelope, "credit_limit_changed", details)
                        .to_value()?,
                ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }

    /// The source row is closed out under its own version gate; the target
    /// row belongs to a different aggregate stream, so its mirror entry is
    /// applied without a gate.
    async fn on_merged(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: ClientMerged = envelope.data.decode()?;
        let target_id = AggregateId::new(payload.target_client_id.clone());

        let source_summary = stamped(
            UpdateDocument::new().set("status", json!(ClientStatus::Merged)),
            envelope,
        );
        let source_detail = stamped(
            UpdateDocument::new()
                .set("status", json!(ClientStatus::Merged))
                .set("mergedInto", json!(payload.target_client_id))
                .push(
                    "activityLog",
                    ActivityEntry::from_envelope(
                        envelope,
                        "merged",
                        format!("merged into {}", payload.target_client_name),
                    )
                    .to_value()?,
                ),
            envelope,
        );

        self.store
            .update(SUMMARIES, gated_filter(envelope), source_summary)
            .await?;
        self.store
            .update(DETAILS, gated_filter(envelope), source_detail)
            .await?;

        let mirror = UpdateDocument::new()
            .set("updatedAt", json!(envelope.timestamp))
            .push(
                "activityLog",
                ActivityEntry::from_envelope(
                    envelope,
                    "merge_received",
                    format!("absorbed client {}", envelope.aggregate_id),
                )
                .to_value()?,
            );
        self.store
            .update(
                DETAILS,
                Filter::key(target_id.clone(), envelope.tenant_id.clone()),
                mirror,
            )
            .await?;

        invalidate_entity(self.cache.as_ref(), FAMILY, &target_id).await
    }

    async fn on_deactivated(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: ClientDeactivated = envelope.data.decode()?;

        let summary = stamped(
            UpdateDocument::new().set("status", json!(ClientStatus::Inactive)),
            envelope,
        );
        let detail = stamped(
            UpdateDocument::new()
                .set("status", json!(ClientStatus::Inactive))
                .push(
                    "activityLog",
                    ActivityEntry::from_envelope(envelope, "deactivated", payload.reason.clone())
                        .to_value()?,
                ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }
}

#[async_trait]
impl EventHandler for ClientProjection {
    fn name(&self) -> &'static str {
        "ClientProjection"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<()> {
        match envelope.event_type.as_str() {
            client::CLIENT_CREATED => self.on_created(envelope).await?,
            client::CLIENT_UPDATED => self.on_updated(envelope).await?,
            client::CLIENT_CREDIT_LIMIT_CHANGED => self.on_credit_limit_changed(envelope).await?,
            client::CLIENT_MERGED => self.on_merged(envelope).await?,
            client::CLIENT_DEACTIVATED => self.on_deactivated(envelope).await?,
            _ => return Ok(()),
        }
        invalidate_entity(self.cache.as_ref(), FAMILY, &envelope.aggregate_id).await
    }
}
