//! Invoice projection: summaries, details with line items, payment tracking.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, TenantId};
use domain::invoice::{
    self, InvoiceCreated, InvoiceLine, InvoiceLineAdded, InvoiceLineRemoved,
    InvoicePaymentRecorded, InvoiceSent, InvoiceStatus, InvoiceVoided,
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

pub const SUMMARIES: &str = "invoice_summaries";
pub const DETAILS: &str = "invoice_details";
const FAMILY: &str = "invoice";

/// List/search-optimized invoice row.
///
/// `amountDue` is an explicit, incrementally maintained field, not derived
/// at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSummaryRow {
    pub id: AggregateId,
    pub tenant_id: TenantId,
    pub invoice_number: String,
    pub client_id: String,
    pub client_name: String,
    pub currency: String,
    pub status: InvoiceStatus,
    #[serde(with = "rust_decimal::serde::str")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub tax_amount: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_paid: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount_due: Decimal,
    pub line_count: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub paid_date: Option<DateTime<Utc>>,
    pub last_applied_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full invoice view with line items and the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetailRow {
    #[serde(flatten)]
    pub summary: InvoiceSummaryRow,
    pub lines: Vec<InvoiceLine>,
    pub activity_log: Vec<ActivityEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub void_reason: Option<String>,
}

/// Projects invoice events into the invoice read models.
pub struct InvoiceProjection {
    store: Arc<dyn ReadModelStore>,
    cache: Arc<dyn Cache>,
}

impl InvoiceProjection {
    pub const EVENT_TYPES: &'static [&'static str] = &[
        invoice::INVOICE_CREATED,
        invoice::INVOICE_LINE_ADDED,
        invoice::INVOICE_LINE_REMOVED,
        invoice::INVOICE_SENT,
        invoice::INVOICE_PAYMENT_RECORDED,
        invoice::INVOICE_VOIDED,
    ];

    pub fn new(store: Arc<dyn ReadModelStore>, cache: Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    /// Registers this projection for every invoice event type.
    pub fn register(self: Arc<Self>, registry: &mut HandlerRegistry) {
        registry.register_all(Self::EVENT_TYPES, self);
    }

    async fn on_created(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: InvoiceCreated = envelope.data.decode()?;
        let summary = InvoiceSummaryRow {
            id: envelope.aggregate_id.clone(),
            tenant_id: envelope.tenant_id.clone(),
            invoice_number: payload.invoice_number,
            client_id: payload.client_id,
            client_name: payload.client_name,
            currency: payload.currency,
            status: InvoiceStatus::Draft,
            subtotal: payload.subtotal,
            tax_amount: payload.tax_amount,
            total: payload.total,
            amount_paid: Decimal::ZERO,
            // A fresh invoice owes its full total.
            amount_due: payload.total,
            line_count: 0,
            due_date: payload.due_date,
            paid_date: None,
            last_applied_version: envelope.version,
            created_at: envelope.timestamp,
            updated_at: envelope.timestamp,
        };
        let detail = InvoiceDetailRow {
            summary: summary.clone(),
            lines: Vec::new(),
            activity_log: vec![ActivityEntry::from_envelope(envelope, "created", "")],
            void_reason: None,
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

    async fn on_line_added(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: InvoiceLineAdded = envelope.data.decode()?;
        let line = payload.as_line();

        let amounts = |update: UpdateDocument| {
            update
                .inc("lineCount", 1)
                .inc_decimal("subtotal", payload.subtotal)
                .inc_decimal("taxAmount", payload.tax_amount)
                .inc_decimal("total", payload.total)
                .inc_decimal("amountDue", payload.total)
        };

        let summary = stamped(amounts(UpdateDocument::new()), envelope);
        let detail = stamped(
            amounts(UpdateDocument::new())
                .push("lines", serde_json::to_value(&line)?)
                .push(
                    "activityLog",
                    ActivityEntry::from_envelope(
                        envelope,
                        "lineitem_added",
                        format!("line {} added", line.id),
                    )
                    .to_value()?,
                ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }

    async fn on_line_removed(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: InvoiceLineRemoved = envelope.data.decode()?;

        let amounts = |update: UpdateDocument| {
            update
                .inc("lineCount", -1)
                .inc_decimal("subtotal", -payload.subtotal)
                .inc_decimal("taxAmount", -payload.tax_amount)
                .inc_decimal("total", -payload.total)
                .inc_decimal("amountDue", -payload.total)
        };

        let summary = stamped(amounts(UpdateDocument::new()), envelope);
        let detail = stamped(
            amounts(UpdateDocument::new())
                .pull("lines", "id", json!(payload.line_id))
                .push(
                    "activityLog",
                    ActivityEntry::from_envelope(
                        envelope,
                        "lineitem_removed",
                        format!("line {} removed", payload.line_id),
                    )
                    .to_value()?,
                ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }

    async fn on_sent(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: InvoiceSent = envelope.data.decode()?;

        let summary = stamped(
            UpdateDocument::new().set("status", json!(InvoiceStatus::Sent)),
            envelope,
        );
        let detail = stamped(
            UpdateDocument::new()
                .set("status", json!(InvoiceStatus::Sent))
                .push(
                    "activityLog",
                    ActivityEntry::from_envelope(
                        envelope,
                        "sent",
                        format!("sent to {}", payload.sent_to),
                    )
                    .to_value()?,
                ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }

    async fn on_payment_recorded(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: InvoicePaymentRecorded = envelope.data.decode()?;
        let paid_off = payload.amount_due.is_zero();

        let balances = |update: UpdateDocument| {
            let update = update
                .set("amountPaid", json!(payload.amount_paid.to_string()))
                .set("amountDue", json!(payload.amount_due.to_string()));
            if paid_off {
                // Status flips to paid only once the due amount reaches zero.
                update
                    .set("status", json!(InvoiceStatus::Paid))
                    .set("paidDate", json!(envelope.timestamp))
            } else {
                update
            }
        };

        let summary = stamped(balances(UpdateDocument::new()), envelope);
        let detail = stamped(
            balances(UpdateDocument::new()).push(
                "activityLog",
                ActivityEntry::from_envelope(
                    envelope,
                    "payment_recorded",
                    format!("payment {} of {}", payload.payment_id, payload.amount),
                )
                .to_value()?,
            ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }

    async fn on_voided(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: InvoiceVoided = envelope.data.decode()?;

        // Void flips status and keeps the row; nothing is hard-deleted.
        let summary = stamped(
            UpdateDocument::new().set("status", json!(InvoiceStatus::Voided)),
            envelope,
        );
        let detail = stamped(
            UpdateDocument::new()
                .set("status", json!(InvoiceStatus::Voided))
                .set("voidReason", json!(payload.reason))
                .push(
                    "activityLog",
                    ActivityEntry::from_envelope(envelope, "voided", payload.reason.clone())
                        .to_value()?,
                ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }
}

#[async_trait]
impl EventHandler for InvoiceProjection {
    fn name(&self) -> &'static str {
        "InvoiceProjection"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<()> {
        match envelope.event_type.as_str() {
            invoice::INVOICE_CREATED => self.on_created(envelope).await?,
            invoice::INVOICE_LINE_ADDED => self.on_line_added(envelope).await?,
            invoice::INVOICE_LINE_REMOVED => self.on_line_removed(envelope).await?,
            invoice::INVOICE_SENT => self.on_sent(envelope).await?,
            invoice::INVOICE_PAYMENT_RECORDED => self.on_payment_recorded(envelope).await?,
            invoice::INVOICE_VOIDED => self.on_voided(envelope).await?,
            _ => return Ok(()),
        }
        invalidate_entity(self.cache.as_ref(), FAMILY, &envelope.aggregate_id).await
    }
}
