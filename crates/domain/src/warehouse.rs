//! Warehouse and inventory aggregate family.
//!
//! Warehouse operation events carry the operation as the aggregate;
//! stock movement events carry the warehouse as the aggregate, so all
//! inventory deltas for one warehouse share one causal stream.

use chrono::{DateTime, Utc};
use common::{AggregateId, TenantId, UserId};
use events::{EventData, EventEnvelope};
use serde::{Deserialize, Serialize};

pub const AGGREGATE_TYPE: &str = "Warehouse";

pub const WAREHOUSE_CREATED: &str = "warehouse.created";
pub const OPERATION_CREATED: &str = "warehouse.operation.created";
pub const OPERATION_STARTED: &str = "warehouse.operation.started";
pub const OPERATION_COMPLETED: &str = "warehouse.operation.completed";
pub const OPERATION_CANCELLED: &str = "warehouse.operation.cancelled";
pub const STOCK_RESERVED: &str = "inventory.stock.reserved";
pub const STOCK_COMMITTED: &str = "inventory.stock.committed";
pub const STOCK_RELEASED: &str = "inventory.stock.released";
pub const INVENTORY_ADJUSTED: &str = "inventory.adjusted";

/// Warehouse operation lifecycle: `created → started → completed/cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Created,
    Started,
    Completed,
    Cancelled,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Created => "created",
            OperationStatus::Started => "started",
            OperationStatus::Completed => "completed",
            OperationStatus::Cancelled => "cancelled",
        }
    }
}

/// Write-side warehouse snapshot used to construct events.
#[derive(Debug, Clone)]
pub struct Warehouse {
    pub id: AggregateId,
    pub tenant_id: TenantId,
    pub name: String,
    pub code: String,
    pub location: String,
}

/// Payload for `warehouse.created`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseCreated {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub location: String,
}

/// Payload for `warehouse.operation.created`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCreated {
    #[serde(default)]
    pub warehouse_id: String,
    #[serde(default)]
    pub operation_type: String,
    #[serde(default)]
    pub reference: String,
}

/// Payload for `warehouse.operation.started`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStarted {
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
}

/// Payload for `warehouse.operation.completed`.
///
/// Carries `startedAt` so the projection can compute the elapsed duration
/// without reading prior state; absent means no duration is recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCompleted {
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Payload for `warehouse.operation.cancelled`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationCancelled {
    #[serde(default)]
    pub reason: String,
}

/// Payload for the stock movement events
/// (`inventory.stock.reserved/committed/released`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub reference: String,
}

/// Payload for `inventory.adjusted`.
///
/// An adjustment is an absolute snapshot, not a delta: it carries the
/// previous and new on-hand quantities explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAdjusted {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub previous_quantity: i64,
    #[serde(default)]
    pub new_quantity: i64,
    #[serde(default)]
    pub reason: String,
}

pub fn warehouse_created(
    warehouse: &Warehouse,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = WarehouseCreated {
        name: warehouse.name.clone(),
        code: warehouse.code.clone(),
        location: warehouse.location.clone(),
    };
    Ok(EventEnvelope::new(
        warehouse.id.clone(),
        AGGREGATE_TYPE,
        WAREHOUSE_CREATED,
        warehouse.tenant_id.clone(),
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn operation_created(
    operation_id: AggregateId,
    tenant_id: TenantId,
    payload: &OperationCreated,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    Ok(EventEnvelope::new(
        operation_id,
        AGGREGATE_TYPE,
        OPERATION_CREATED,
        tenant_id,
        user_id,
        EventData::from_serialize(payload)?,
    ))
}

pub fn operation_started(
    operation_id: AggregateId,
    tenant_id: TenantId,
    started_at: DateTime<Utc>,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = OperationStarted {
        started_at: Some(started_at),
    };
    Ok(EventEnvelope::new(
        operation_id,
        AGGREGATE_TYPE,
        OPERATION_STARTED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn operation_completed(
    operation_id: AggregateId,
    tenant_id: TenantId,
    started_at: Option<DateTime<Utc>>,
    completed_at: DateTime<Utc>,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = OperationCompleted {
        started_at,
        completed_at: Some(completed_at),
    };
    Ok(EventEnvelope::new(
        operation_id,
        AGGREGATE_TYPE,
        OPERATION_COMPLETED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn operation_cancelled(
    operation_id: AggregateId,
    tenant_id: TenantId,
    reason: impl Into<String>,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = OperationCancelled {
        reason: reason.into(),
    };
    Ok(EventEnvelope::new(
        operation_id,
        AGGREGATE_TYPE,
        OPERATION_CANCELLED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

fn stock_event(
    event_type: &'static str,
    warehouse_id: AggregateId,
    tenant_id: TenantId,
    movement: &StockMovement,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    Ok(EventEnvelope::new(
        warehouse_id,
        AGGREGATE_TYPE,
        event_type,
        tenant_id,
        user_id,
        EventData::from_serialize(movement)?,
    ))
}

pub fn stock_reserved(
    warehouse_id: AggregateId,
    tenant_id: TenantId,
    movement: &StockMovement,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    stock_event(STOCK_RESERVED, warehouse_id, tenant_id, movement, user_id)
}

pub fn stock_committed(
    warehouse_id: AggregateId,
    tenant_id: TenantId,
    movement: &StockMovement,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    stock_event(STOCK_COMMITTED, warehouse_id, tenant_id, movement, user_id)
}

pub fn stock_released(
    warehouse_id: AggregateId,
    tenant_id: TenantId,
    movement: &StockMovement,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    stock_event(STOCK_RELEASED, warehouse_id, tenant_id, movement, user_id)
}

pub fn inventory_adjusted(
    warehouse_id: AggregateId,
    tenant_id: TenantId,
    payload: &InventoryAdjusted,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    Ok(EventEnvelope::new(
        warehouse_id,
        AGGREGATE_TYPE,
        INVENTORY_ADJUSTED,
        tenant_id,
        user_id,
        EventData::from_serialize(payload)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warehouse_created_subject() {
        let warehouse = Warehouse {
            id: AggregateId::new("wh-1"),
            tenant_id: TenantId::new("tenant-a"),
            name: "Main".to_string(),
            code: "WH-MAIN".to_string(),
            location: "Lima".to_string(),
        };
        let envelope = warehouse_created(&warehouse, UserId::new("user-1")).unwrap();
        assert_eq!(envelope.subject(), "evt.Warehouse.warehouse.created");
        assert_eq!(envelope.data.str_or_default("code"), "WH-MAIN");
    }

    #[test]
    fn completed_payload_allows_missing_started_at() {
        let data: EventData =
            serde_json::from_str(r#"{"completedAt": "2024-05-01T12:00:00Z"}"#).unwrap();
        let payload: OperationCompleted = data.decode().unwrap();
        assert!(payload.started_at.is_none());
        assert!(payload.completed_at.is_some());
    }

    #[test]
    fn adjustment_carries_quantity_snapshot() {
        let payload = InventoryAdjusted {
            product_id: "SKU-1".to_string(),
            previous_quantity: 10,
            new_quantity: 7,
            reason: "cycle count".to_string(),
        };
        let envelope = inventory_adjusted(
            AggregateId::new("wh-1"),
            TenantId::new("tenant-a"),
            &payload,
            UserId::new("user-1"),
        )
        .unwrap();
        assert_eq!(envelope.data.i64_or_default("previousQuantity"), 10);
        assert_eq!(envelope.data.i64_or_default("newQuantity"), 7);
    }
}
