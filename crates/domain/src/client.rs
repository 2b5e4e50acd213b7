//! Client aggregate family.

use common::{AggregateId, TenantId, UserId};
use events::{EventData, EventEnvelope};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const AGGREGATE_TYPE: &str = "Client";

pub const CLIENT_CREATED: &str = "client.created";
pub const CLIENT_UPDATED: &str = "client.updated";
pub const CLIENT_CREDIT_LIMIT_CHANGED: &str = "client.creditlimit.changed";
pub const CLIENT_MERGED: &str = "client.merged";
pub const CLIENT_DEACTIVATED: &str = "client.deactivated";

/// Client account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Inactive,
    Merged,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Active => "active",
            ClientStatus::Inactive => "inactive",
            ClientStatus::Merged => "merged",
        }
    }
}

/// Write-side client snapshot used to construct events.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: AggregateId,
    pub tenant_id: TenantId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub credit_limit: Decimal,
}

/// Payload for `client.created`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCreated {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub credit_limit: Decimal,
}

/// Payload for `client.updated`. Empty fields mean "unchanged".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientUpdated {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Payload for `client.creditlimit.changed`.
///
/// Carries both limits so the activity log can record the before/after text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCreditLimitChanged {
    #[serde(default, with = "rust_decimal::serde::str")]
    pub previous_limit: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub new_limit: Decimal,
}

/// Payload for `client.merged`. The envelope's aggregate is the source
/// client being folded into `targetClientId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMerged {
    #[serde(default)]
    pub target_client_id: String,
    #[serde(default)]
    pub target_client_name: String,
}

/// Payload for `client.deactivated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDeactivated {
    #[serde(default)]
    pub reason: String,
}

pub fn client_created(
    client: &Client,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = ClientCreated {
        name: client.name.clone(),
        email: client.email.clone(),
        phone: client.phone.clone(),
        credit_limit: client.credit_limit,
    };
    Ok(EventEnvelope::new(
        client.id.clone(),
        AGGREGATE_TYPE,
        CLIENT_CREATED,
        client.tenant_id.clone(),
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn client_updated(
    client_id: AggregateId,
    tenant_id: TenantId,
    payload: &ClientUpdated,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    Ok(EventEnvelope::new(
        client_id,
        AGGREGATE_TYPE,
        CLIENT_UPDATED,
        tenant_id,
        user_id,
        EventData::from_serialize(payload)?,
    ))
}

pub fn client_credit_limit_changed(
    client_id: AggregateId,
    tenant_id: TenantId,
    previous_limit: Decimal,
    new_limit: Decimal,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = ClientCreditLimitChanged {
        previous_limit,
        new_limit,
    };
    Ok(EventEnvelope::new(
        client_id,
        AGGREGATE_TYPE,
        CLIENT_CREDIT_LIMIT_CHANGED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn client_merged(
    source_client_id: AggregateId,
    tenant_id: TenantId,
    target_client_id: AggregateId,
    target_client_name: impl Into<String>,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = ClientMerged {
        target_client_id: target_client_id.to_string(),
        target_client_name: target_client_name.into(),
    };
    Ok(EventEnvelope::new(
        source_client_id,
        AGGREGATE_TYPE,
        CLIENT_MERGED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn client_deactivated(
    client_id: AggregateId,
    tenant_id: TenantId,
    reason: impl Into<String>,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = ClientDeactivated {
        reason: reason.into(),
    };
    Ok(EventEnvelope::new(
        client_id,
        AGGREGATE_TYPE,
        CLIENT_DEACTIVATED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}
