//! Invoice aggregate family.

use chrono::{DateTime, Utc};
use common::{AggregateId, TenantId, UserId};
use events::{EventData, EventEnvelope};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate type string used in envelopes and routing subjects.
pub const AGGREGATE_TYPE: &str = "Invoice";

pub const INVOICE_CREATED: &str = "invoice.created";
pub const INVOICE_LINE_ADDED: &str = "invoice.lineitem.added";
pub const INVOICE_LINE_REMOVED: &str = "invoice.lineitem.removed";
pub const INVOICE_SENT: &str = "invoice.sent";
pub const INVOICE_PAYMENT_RECORDED: &str = "invoice.payment.recorded";
pub const INVOICE_VOIDED: &str = "invoice.voided";

/// Invoice lifecycle status as the read side presents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Voided,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Voided => "voided",
        }
    }
}

/// One invoice line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub subtotal: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub tax_amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub total: Decimal,
}

/// Write-side invoice snapshot used to construct events.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub id: AggregateId,
    pub tenant_id: TenantId,
    pub invoice_number: String,
    pub client_id: AggregateId,
    pub client_name: String,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub due_date: Option<DateTime<Utc>>,
}

/// Payload for `invoice.created`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCreated {
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub subtotal: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub tax_amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub total: Decimal,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Payload for `invoice.lineitem.added`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineAdded {
    #[serde(default)]
    pub line_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub unit_price: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub subtotal: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub tax_amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub total: Decimal,
}

impl InvoiceLineAdded {
    /// The line item this payload describes.
    pub fn as_line(&self) -> InvoiceLine {
        InvoiceLine {
            id: self.line_id.clone(),
            description: self.description.clone(),
            quantity: self.quantity,
            unit_price: self.unit_price,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total: self.total,
        }
    }
}

/// Payload for `invoice.lineitem.removed`.
///
/// Carries the removed line's amounts so the projection can decrement
/// totals without reading prior state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineRemoved {
    #[serde(default)]
    pub line_id: String,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub subtotal: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub tax_amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub total: Decimal,
}

/// Payload for `invoice.sent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSent {
    #[serde(default)]
    pub sent_to: String,
}

/// Payload for `invoice.payment.recorded`.
///
/// The command side computes the post-payment balances; the projection
/// applies them as absolute values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePaymentRecorded {
    #[serde(default)]
    pub payment_id: String,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub amount_paid: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub amount_due: Decimal,
    #[serde(default)]
    pub status: String,
}

/// Payload for `invoice.voided`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceVoided {
    #[serde(default)]
    pub reason: String,
}

pub fn invoice_created(
    invoice: &Invoice,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = InvoiceCreated {
        invoice_number: invoice.invoice_number.clone(),
        client_id: invoice.client_id.to_string(),
        client_name: invoice.client_name.clone(),
        currency: invoice.currency.clone(),
        subtotal: invoice.subtotal,
        tax_amount: invoice.tax_amount,
        total: invoice.total,
        due_date: invoice.due_date,
    };
    Ok(EventEnvelope::new(
        invoice.id.clone(),
        AGGREGATE_TYPE,
        INVOICE_CREATED,
        invoice.tenant_id.clone(),
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn invoice_line_added(
    invoice_id: AggregateId,
    tenant_id: TenantId,
    line: &InvoiceLine,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = InvoiceLineAdded {
        line_id: line.id.clone(),
        description: line.description.clone(),
        quantity: line.quantity,
        unit_price: line.unit_price,
        subtotal: line.subtotal,
        tax_amount: line.tax_amount,
        total: line.total,
    };
    Ok(EventEnvelope::new(
        invoice_id,
        AGGREGATE_TYPE,
        INVOICE_LINE_ADDED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn invoice_line_removed(
    invoice_id: AggregateId,
    tenant_id: TenantId,
    line: &InvoiceLine,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = InvoiceLineRemoved {
        line_id: line.id.clone(),
        subtotal: line.subtotal,
        tax_amount: line.tax_amount,
        total: line.total,
    };
    Ok(EventEnvelope::new(
        invoice_id,
        AGGREGATE_TYPE,
        INVOICE_LINE_REMOVED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn invoice_sent(
    invoice_id: AggregateId,
    tenant_id: TenantId,
    sent_to: impl Into<String>,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = InvoiceSent {
        sent_to: sent_to.into(),
    };
    Ok(EventEnvelope::new(
        invoice_id,
        AGGREGATE_TYPE,
        INVOICE_SENT,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn invoice_payment_recorded(
    invoice_id: AggregateId,
    tenant_id: TenantId,
    payload: &InvoicePaymentRecorded,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    Ok(EventEnvelope::new(
        invoice_id,
        AGGREGATE_TYPE,
        INVOICE_PAYMENT_RECORDED,
        tenant_id,
        user_id,
        EventData::from_serialize(payload)?,
    ))
}

pub fn invoice_voided(
    invoice_id: AggregateId,
    tenant_id: TenantId,
    reason: impl Into<String>,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = InvoiceVoided {
        reason: reason.into(),
    };
    Ok(EventEnvelope::new(
        invoice_id,
        AGGREGATE_TYPE,
        INVOICE_VOIDED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}
