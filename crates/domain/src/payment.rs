//! Payment aggregate family.

use chrono::{DateTime, Utc};
use common::{AggregateId, TenantId, UserId};
use events::{EventData, EventEnvelope};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const AGGREGATE_TYPE: &str = "Payment";

pub const PAYMENT_CREATED: &str = "payment.created";
pub const PAYMENT_COMPLETED: &str = "payment.completed";
pub const PAYMENT_FAILED: &str = "payment.failed";
pub const PAYMENT_REFUNDED: &str = "payment.refunded";
pub const PAYMENT_CANCELLED: &str = "payment.cancelled";

/// Payment state machine: `pending → completed/failed/refunded/cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

/// Write-side payment snapshot used to construct events.
#[derive(Debug, Clone)]
pub struct Payment {
    pub id: AggregateId,
    pub tenant_id: TenantId,
    pub invoice_id: AggregateId,
    pub client_id: AggregateId,
    pub amount: Decimal,
    pub currency: String,
    pub method: String,
}

/// Payload for `payment.created`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCreated {
    #[serde(default)]
    pub invoice_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub amount: Decimal,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub method: String,
}

/// Payload for `payment.completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCompleted {
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

/// Payload for `payment.failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFailed {
    #[serde(default)]
    pub reason: String,
}

/// Payload for `payment.refunded`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRefunded {
    #[serde(default)]
    pub reason: String,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

/// Payload for `payment.cancelled`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCancelled {
    #[serde(default)]
    pub reason: String,
}

pub fn payment_created(
    payment: &Payment,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = PaymentCreated {
        invoice_id: payment.invoice_id.to_string(),
        client_id: payment.client_id.to_string(),
        amount: payment.amount,
        currency: payment.currency.clone(),
        method: payment.method.clone(),
    };
    Ok(EventEnvelope::new(
        payment.id.clone(),
        AGGREGATE_TYPE,
        PAYMENT_CREATED,
        payment.tenant_id.clone(),
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn payment_completed(
    payment_id: AggregateId,
    tenant_id: TenantId,
    reference: impl Into<String>,
    processed_at: Option<DateTime<Utc>>,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = PaymentCompleted {
        reference: reference.into(),
        processed_at,
    };
    Ok(EventEnvelope::new(
        payment_id,
        AGGREGATE_TYPE,
        PAYMENT_COMPLETED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn payment_failed(
    payment_id: AggregateId,
    tenant_id: TenantId,
    reason: impl Into<String>,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = PaymentFailed {
        reason: reason.into(),
    };
    Ok(EventEnvelope::new(
        payment_id,
        AGGREGATE_TYPE,
        PAYMENT_FAILED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn payment_refunded(
    payment_id: AggregateId,
    tenant_id: TenantId,
    reason: impl Into<String>,
    amount: Decimal,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = PaymentRefunded {
        reason: reason.into(),
        amount,
    };
    Ok(EventEnvelope::new(
        payment_id,
        AGGREGATE_TYPE,
        PAYMENT_REFUNDED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn payment_cancelled(
    payment_id: AggregateId,
    tenant_id: TenantId,
    reason: impl Into<String>,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = PaymentCancelled {
        reason: reason.into(),
    };
    Ok(EventEnvelope::new(
        payment_id,
        AGGREGATE_TYPE,
        PAYMENT_CANCELLED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}
