//! Payment projection: state machine over the payment read models.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, TenantId};
use domain::payment::{
    self, PaymentCancelled, PaymentCompleted, PaymentCreated, PaymentFailed, PaymentRefunded,
    PaymentStatus,
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
use crate::store::{ReadModelStore, UpdateDocument};

pub const SUMMARIES: &str = "payment_summaries";
pub const DETAILS: &str = "payment_details";
const FAMILY: &str = "payment";

/// List-optimized payment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummaryRow {
    pub id: AggregateId,
    pub tenant_id: TenantId,
    pub invoice_id: String,
    pub client_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    pub currency: String,
    pub method: String,
    pub status: PaymentStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub last_applied_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full payment view with the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetailRow {
    #[serde(flatten)]
    pub summary: PaymentSummaryRow,
    #[serde(default)]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub activity_log: Vec<ActivityEntry>,
}

/// Projects payment events into the payment read models.
pub struct PaymentProjection {
    store: Arc<dyn ReadModelStore>,
    cache: Arc<dyn Cache>,
}

impl PaymentProjection {
    pub const EVENT_TYPES: &'static [&'static str] = &[
        payment::PAYMENT_CREATED,
        payment::PAYMENT_COMPLETED,
        payment::PAYMENT_FAILED,
        payment::PAYMENT_REFUNDED,
        payment::PAYMENT_CANCELLED,
    ];

    pub fn new(store: Arc<dyn ReadModelStore>, cache: Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    /// Registers this projection for every payment event type.
    pub fn register(self: Arc<Self>, registry: &mut HandlerRegistry) {
        registry.register_all(Self::EVENT_TYPES, self);
    }

    async fn on_created(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: PaymentCreated = envelope.data.decode()?;
        let summary = PaymentSummaryRow {
            id: envelope.aggregate_id.clone(),
            tenant_id: envelope.tenant_id.clone(),
            invoice_id: payload.invoice_id,
            client_id: payload.client_id,
            amount: payload.amount,
            currency: payload.currency,
            method: payload.method,
            status: PaymentStatus::Pending,
            processed_at: None,
            last_applied_version: envelope.version,
            created_at: envelope.timestamp,
            updated_at: envelope.timestamp,
        };
        let detail = PaymentDetailRow {
            summary: summary.clone(),
            reference: String::new(),
            failure_reason: None,
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

    async fn on_completed(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: PaymentCompleted = envelope.data.decode()?;
        let processed_at = payload.processed_at.unwrap_or(envelope.timestamp);

        let status = |update: UpdateDocument| {
            update
                .set("status", json!(PaymentStatus::Completed))
                .set("processedAt", json!(processed_at))
        };

        let summary = stamped(status(UpdateDocument::new()), envelope);
        let detail = stamped(
            status(UpdateDocument::new())
                .set("reference", json!(payload.reference))
                .push(
                    "activityLog",
                    ActivityEntry::from_envelope(
                        envelope,
                        "completed",
                        format!("reference {}", payload.reference),
                    )
                    .to_value()?,
                ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }

    async fn on_failed(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: PaymentFailed = envelope.data.decode()?;

        let summary = stamped(
            UpdateDocument::new().set("status", json!(PaymentStatus::Failed)),
            envelope,
        );
        let detail = stamped(
            UpdateDocument::new()
                .set("status", json!(PaymentStatus::Failed))
                .set("failureReason", json!(payload.reason))
                .push(
                    "activityLog",
                    ActivityEntry::from_envelope(envelope, "failed", payload.reason.clone())
                        .to_value()?,
                ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }

    async fn on_refunded(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: PaymentRefunded = envelope.data.decode()?;

        let summary = stamped(
            UpdateDocument::new().set("status", json!(PaymentStatus::Refunded)),
            envelope,
        );
        let detail = stamped(
            UpdateDocument::new()
                .set("status", json!(PaymentStatus::Refunded))
                .push(
                    "activityLog",
                    ActivityEntry::from_envelope(
                        envelope,
                        "refunded",
                        format!("{} refunded: {}", payload.amount, payload.reason),
                    )
                    .to_value()?,
                ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }

    async fn on_cancelled(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: PaymentCancelled = envelope.data.decode()?;

        let summary = stamped(
            UpdateDocument::new().set("status", json!(PaymentStatus::Cancelled)),
            envelope,
        );
        let detail = stamped(
            UpdateDocument::new()
                .set("status", json!(PaymentStatus::Cancelled))
                .push(
                    "activityLog",
                    ActivityEntry::from_envelope(envelope, "cancelled", payload.reason.clone())
                        .to_value()?,
                ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }
}

#[async_trait]
impl EventHandler for PaymentProjection {
    fn name(&self) -> &'static str {
        "PaymentProjection"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<()> {
        match envelope.event_type.as_str() {
            payment::PAYMENT_CREATED => self.on_created(envelope).await?,
            payment::PAYMENT_COMPLETED => self.on_completed(envelope).await?,
            payment::PAYMENT_FAILED => self.on_failed(envelope).await?,
            payment::PAYMENT_REFUNDED => self.on_refunded(envelope).await?,
            payment::PAYMENT_CANCELLED => self.on_cancelled(envelope).await?,
            _ => return Ok(()),
        }
        invalidate_entity(self.cache.as_ref(), FAMILY, &envelope.aggregate_id).await
    }
}
