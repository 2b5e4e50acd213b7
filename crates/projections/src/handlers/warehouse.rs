//! Warehouse, operation, and inventory-level projections.
//!
//! One handler covers three read-model families: warehouse rows keyed by
//! warehouse id, operation rows keyed by operation id, and inventory
//! levels keyed by `<warehouseId>:<productId>` so every product in a
//! warehouse has its own row while sharing the warehouse event stream.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, TenantId};
use domain::warehouse::{
    self, InventoryAdjusted, OperationCancelled, OperationCompleted, OperationCreated,
    OperationStarted, OperationStatus, StockMovement, WarehouseCreated,
};
use events::EventEnvelope;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::Result;
use crate::cache::Cache;
use crate::handler::EventHandler;
use crate::handlers::{created_row, gated_filter, stamped};
use crate::read_model::{ActivityEntry, invalidate_entity};
use crate::registry::HandlerRegistry;
use crate::store::{Filter, ReadModelStore, UpdateDocument};

pub const WAREHOUSE_SUMMARIES: &str = "warehouse_summaries";
pub const OPERATION_SUMMARIES: &str = "warehouse_operation_summaries";
pub const OPERATION_DETAILS: &str = "warehouse_operation_details";
pub const INVENTORY_LEVELS: &str = "inventory_levels";

const WAREHOUSE_FAMILY: &str = "warehouse";
const OPERATION_FAMILY: &str = "operation";
const INVENTORY_FAMILY: &str = "inventory";

/// Warehouse master-data row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseRow {
    pub id: AggregateId,
    pub tenant_id: TenantId,
    pub name: String,
    pub code: String,
    pub location: String,
    pub last_applied_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List-optimized operation row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSummaryRow {
    pub id: AggregateId,
    pub tenant_id: TenantId,
    pub warehouse_id: String,
    pub operation_type: String,
    pub reference: String,
    pub status: OperationStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    pub last_applied_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full operation view with the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationDetailRow {
    #[serde(flatten)]
    pub summary: OperationSummaryRow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    pub activity_log: Vec<ActivityEntry>,
}

/// Per-product stock level inside one warehouse. Rows are created lazily
/// by the first stock event for a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLevelRow {
    pub id: String,
    pub tenant_id: TenantId,
    pub warehouse_id: String,
    pub product_id: String,
    #[serde(default)]
    pub on_hand: i64,
    #[serde(default)]
    pub reserved: i64,
    pub last_applied_version: i64,
    pub updated_at: DateTime<Utc>,
}

fn inventory_row_id(warehouse_id: &AggregateId, product_id: &str) -> AggregateId {
    AggregateId::new(format!("{warehouse_id}:{product_id}"))
}

/// Projects warehouse, operation, and stock events into their read models.
pub struct WarehouseProjection {
    store: Arc<dyn ReadModelStore>,
    cache: Arc<dyn Cache>,
}

impl WarehouseProjection {
    pub const EVENT_TYPES: &'static [&'static str] = &[
        warehouse::WAREHOUSE_CREATED,
        warehouse::OPERATION_CREATED,
        warehouse::OPERATION_STARTED,
        warehouse::OPERATION_COMPLETED,
        warehouse::OPERATION_CANCELLED,
        warehouse::STOCK_RESERVED,
        warehouse::STOCK_COMMITTED,
        warehouse::STOCK_RELEASED,
        warehouse::INVENTORY_ADJUSTED,
    ];

    pub fn new(store: Arc<dyn ReadModelStore>, cache: Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    /// Registers this projection for every warehouse and inventory event type.
    pub fn register(self: Arc<Self>, registry: &mut HandlerRegistry) {
        registry.register_all(Self::EVENT_TYPES, self);
    }

    async fn on_warehouse_created(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: WarehouseCreated = envelope.data.decode()?;
        let row = WarehouseRow {
            id: envelope.aggregate_id.clone(),
            tenant_id: envelope.tenant_id.clone(),
            name: payload.name,
            code: payload.code,
            location: payload.location,
            last_applied_version: envelope.version,
            created_at: envelope.timestamp,
            updated_at: envelope.timestamp,
        };
        self.store
            .update(
                WAREHOUSE_SUMMARIES,
                gated_filter(envelope),
                created_row(serde_json::to_value(&row)?)?,
            )
            .await
    }

    async fn on_operation_created(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: OperationCreated = envelope.data.decode()?;
        let summary = OperationSummaryRow {
            id: envelope.aggregate_id.clone(),
            tenant_id: envelope.tenant_id.clone(),
            warehouse_id: payload.warehouse_id,
            operation_type: payload.operation_type,
            reference: payload.reference,
            status: OperationStatus::Created,
            started_at: None,
            completed_at: None,
            duration_seconds: None,
            last_applied_version: envelope.version,
            created_at: envelope.timestamp,
            updated_at: envelope.timestamp,
        };
        let detail = OperationDetailRow {
            summary: summary.clone(),
            cancel_reason: None,
            activity_log: vec![ActivityEntry::from_envelope(envelope, "created", "")],
        };

        self.store
            .update(
                OPERATION_SUMMARIES,
                gated_filter(envelope),
                created_row(serde_json::to_value(&summary)?)?,
            )
            .await?;
        self.store
            .update(
                OPERATION_DETAILS,
                gated_filter(envelope),
                created_row(serde_json::to_value(&detail)?)?,
            )
            .await
    }

    async fn on_operation_started(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: OperationStarted = envelope.data.decode()?;
        let started_at = payload.started_at.unwrap_or(envelope.timestamp);

        let progress = |update: UpdateDocument| {
            update
                .set("status", json!(OperationStatus::Started))
                .set("startedAt", json!(started_at))
        };

        let summary = stamped(progress(UpdateDocument::new()), envelope);
        let detail = stamped(
            progress(UpdateDocument::new()).push(
                "activityLog",
                ActivityEntry::from_envelope(envelope, "started", "").to_value()?,
            ),
            envelope,
        );

        self.store
            .update(OPERATION_SUMMARIES, gated_filter(envelope), summary)
            .await?;
        self.store
            .update(OPERATION_DETAILS, gated_filter(envelope), detail)
            .await
    }

    async fn on_operation_completed(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: OperationCompleted = envelope.data.decode()?;
        let completed_at = payload.completed_at.unwrap_or(envelope.timestamp);
        // No recorded start means no duration.
        let duration_seconds = payload
            .started_at
            .map(|started_at| (completed_at - started_at).num_seconds());

        let progress = |mut update: UpdateDocument| {
            update = update
                .set("status", json!(OperationStatus::Completed))
                .set("completedAt", json!(completed_at));
            if let Some(seconds) = duration_seconds {
                update = update.set("durationSeconds", json!(seconds));
            }
            update
        };

        let summary = stamped(progress(UpdateDocument::new()), envelope);
        let detail = stamped(
            progress(UpdateDocument::new()).push(
                "activityLog",
                ActivityEntry::from_envelope(envelope, "completed", "").to_value()?,
            ),
            envelope,
        );

        self.store
            .update(OPERATION_SUMMARIES, gated_filter(envelope), summary)
            .await?;
        self.store
            .update(OPERATION_DETAILS, gated_filter(envelope), detail)
            .await
    }

    async fn on_operation_cancelled(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: OperationCancelled = envelope.data.decode()?;

        let summary = stamped(
            UpdateDocument::new().set("status", json!(OperationStatus::Cancelled)),
            envelope,
        );
        let detail = stamped(
            UpdateDocument::new()
                .set("status", json!(OperationStatus::Cancelled))
                .set("cancelReason", json!(payload.reason))
                .push(
                    "activityLog",
                    ActivityEntry::from_envelope(envelope, "cancelled", payload.reason.clone())
                        .to_value()?,
                ),
            envelope,
        );

        self.store
            .update(OPERATION_SUMMARIES, gated_filter(envelope), summary)
            .await?;
        self.store
            .update(OPERATION_DETAILS, gated_filter(envelope), detail)
            .await
    }

    /// Applies one stock delta to the product's inventory row, creating the
    /// row if this is the first movement for the product. Returns the row id
    /// for cache invalidation.
    async fn apply_stock_delta(
        &self,
        envelope: &EventEnvelope,
        movement: &StockMovement,
        on_hand_delta: i64,
        reserved_delta: i64,
    ) -> Result<AggregateId> {
        let row_id = inventory_row_id(&envelope.aggregate_id, &movement.product_id);

        let mut update = UpdateDocument::new()
            .set("warehouseId", json!(envelope.aggregate_id))
            .set("productId", json!(movement.product_id))
            .upsert();
        if on_hand_delta != 0 {
            update = update.inc("onHand", on_hand_delta);
        }
        if reserved_delta != 0 {
            update = update.inc("reserved", reserved_delta);
        }

        self.store
            .update(
                INVENTORY_LEVELS,
                Filter::gated(row_id.clone(), envelope.tenant_id.clone(), envelope.version),
                stamped(update, envelope),
            )
            .await?;
        Ok(row_id)
    }

    async fn on_stock_reserved(&self, envelope: &EventEnvelope) -> Result<AggregateId> {
        let movement: StockMovement = envelope.data.decode()?;
        self.apply_stock_delta(envelope, &movement, 0, movement.quantity)
            .await
    }

    async fn on_stock_committed(&self, envelope: &EventEnvelope) -> Result<AggregateId> {
        let movement: StockMovement = envelope.data.decode()?;
        self.apply_stock_delta(envelope, &movement, -movement.quantity, -movement.quantity)
            .await
    }

    async fn on_stock_released(&self, envelope: &EventEnvelope) -> Result<AggregateId> {
        let movement: StockMovement = envelope.data.decode()?;
        self.apply_stock_delta(envelope, &movement, 0, -movement.quantity)
            .await
    }

    /// An adjustment overwrites the on-hand count with the payload's absolute
    /// snapshot rather than applying a delta.
    async fn on_inventory_adjusted(&self, envelope: &EventEnvelope) -> Result<AggregateId> {
        let payload: InventoryAdjusted = envelope.data.decode()?;
        let row_id = inventory_row_id(&envelope.aggregate_id, &payload.product_id);

        let movement = json!({
            "action": "adjusted",
            "previousQuantity": payload.previous_quantity,
            "newQuantity": payload.new_quantity,
            "reason": payload.reason,
            "timestamp": envelope.timestamp,
            "userId": envelope.user_id,
        });
        let update = UpdateDocument::new()
            .set("warehouseId", json!(envelope.aggregate_id))
            .set("productId", json!(payload.product_id))
            .set("onHand", json!(payload.new_quantity))
            .push("movements", movement)
            .upsert();

        self.store
            .update(
                INVENTORY_LEVELS,
                Filter::gated(row_id.clone(), envelope.tenant_id.clone(), envelope.version),
                stamped(update, envelope),
            )
            .await?;
        Ok(row_id)
    }
}

#[async_trait]
impl EventHandler for WarehouseProjection {
    fn name(&self) -> &'static str {
        "WarehouseProjection"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<()> {
        let cache = self.cache.as_ref();
        match envelope.event_type.as_str() {
            warehouse::WAREHOUSE_CREATED => {
                self.on_warehouse_created(envelope).await?;
                invalidate_entity(cache, WAREHOUSE_FAMILY, &envelope.aggregate_id).await
            }
            warehouse::OPERATION_CREATED => {
                self.on_operation_created(envelope).await?;
                invalidate_entity(cache, OPERATION_FAMILY, &envelope.aggregate_id).await
            }
            warehouse::OPERATION_STARTED => {
                self.on_operation_started(envelope).await?;
                invalidate_entity(cache, OPERATION_FAMILY, &envelope.aggregate_id).await
            }
            warehouse::OPERATION_COMPLETED => {
                self.on_operation_completed(envelope).await?;
                invalidate_entity(cache, OPERATION_FAMILY, &envelope.aggregate_id).await
            }
            warehouse::OPERATION_CANCELLED => {
                self.on_operation_cancelled(envelope).await?;
                invalidate_entity(cache, OPERATION_FAMILY, &envelope.aggregate_id).await
            }
            warehouse::STOCK_RESERVED => {
                let row_id = self.on_stock_reserved(envelope).await?;
                invalidate_entity(cache, INVENTORY_FAMILY, &row_id).await
            }
            warehouse::STOCK_COMMITTED => {
                let row_id = self.on_stock_committed(envelope).await?;
                invalidate_entity(cache, INVENTORY_FAMILY, &row_id).await
            }
            warehouse::STOCK_RELEASED => {
                let row_id = self.on_stock_released(envelope).await?;
                invalidate_entity(cache, INVENTORY_FAMILY, &row_id).await
            }
            warehouse::INVENTORY_ADJUSTED => {
                let row_id = self.on_inventory_adjusted(envelope).await?;
                invalidate_entity(cache, INVENTORY_FAMILY, &row_id).await
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::memory::InMemoryReadModelStore;
    use chrono::TimeZone;
    use common::UserId;
    use domain::warehouse::Warehouse;

    fn fixture() -> (Arc<InMemoryReadModelStore>, Arc<InMemoryCache>, WarehouseProjection) {
        let store = Arc::new(InMemoryReadModelStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let projection = WarehouseProjection::new(store.clone(), cache.clone());
        (store, cache, projection)
    }

    fn movement(product: &str, quantity: i64) -> StockMovement {
        StockMovement {
            product_id: product.to_string(),
            quantity,
            reference: "order-1".to_string(),
        }
    }

    #[tokio::test]
    async fn warehouse_created_writes_master_row() {
        let (store, _, projection) = fixture();
        let created = domain::warehouse::warehouse_created(
            &Warehouse {
                id: AggregateId::new("wh-1"),
                tenant_id: TenantId::new("tenant-a"),
                name: "Main".to_string(),
                code: "WH-MAIN".to_string(),
                location: "Lima".to_string(),
            },
            UserId::new("user-1"),
        )
        .unwrap();
        projection.handle(&created).await.unwrap();

        let row = store
            .get(WAREHOUSE_SUMMARIES, &AggregateId::new("wh-1"), &TenantId::new("tenant-a"))
            .await
            .unwrap();
        assert_eq!(row["code"], json!("WH-MAIN"));
    }

    #[tokio::test]
    async fn operation_lifecycle_computes_duration() {
        let (store, _, projection) = fixture();
        let op_id = AggregateId::new("op-1");
        let tenant = TenantId::new("tenant-a");
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let completed = Utc.with_ymd_and_hms(2024, 5, 1, 9, 12, 30).unwrap();

        let created = domain::warehouse::operation_created(
            op_id.clone(),
            tenant.clone(),
            &OperationCreated {
                warehouse_id: "wh-1".to_string(),
                operation_type: "picking".to_string(),
                reference: "order-1".to_string(),
            },
            UserId::new("user-1"),
        )
        .unwrap();
        projection.handle(&created).await.unwrap();

        let start = domain::warehouse::operation_started(
            op_id.clone(),
            tenant.clone(),
            started,
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(2);
        projection.handle(&start).await.unwrap();

        let finish = domain::warehouse::operation_completed(
            op_id.clone(),
            tenant.clone(),
            Some(started),
            completed,
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(3);
        projection.handle(&finish).await.unwrap();

        let summary = store
            .get(OPERATION_SUMMARIES, &op_id, &tenant)
            .await
            .unwrap();
        assert_eq!(summary["status"], json!("completed"));
        assert_eq!(summary["durationSeconds"], json!(750));

        let detail = store.get(OPERATION_DETAILS, &op_id, &tenant).await.unwrap();
        assert_eq!(detail["activityLog"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn completion_without_start_omits_duration() {
        let (store, _, projection) = fixture();
        let op_id = AggregateId::new("op-2");
        let tenant = TenantId::new("tenant-a");

        let created = domain::warehouse::operation_created(
            op_id.clone(),
            tenant.clone(),
            &OperationCreated {
                warehouse_id: "wh-1".to_string(),
                operation_type: "receiving".to_string(),
                reference: String::new(),
            },
            UserId::new("user-1"),
        )
        .unwrap();
        projection.handle(&created).await.unwrap();

        let finish = domain::warehouse::operation_completed(
            op_id.clone(),
            tenant.clone(),
            None,
            Utc::now(),
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(2);
        projection.handle(&finish).await.unwrap();

        let summary = store
            .get(OPERATION_SUMMARIES, &op_id, &tenant)
            .await
            .unwrap();
        assert_eq!(summary["status"], json!("completed"));
        assert!(summary.get("durationSeconds").is_none());
    }

    #[tokio::test]
    async fn cancellation_records_the_reason() {
        let (store, _, projection) = fixture();
        let op_id = AggregateId::new("op-3");
        let tenant = TenantId::new("tenant-a");

        let created = domain::warehouse::operation_created(
            op_id.clone(),
            tenant.clone(),
            &OperationCreated {
                warehouse_id: "wh-1".to_string(),
                operation_type: "picking".to_string(),
                reference: "order-9".to_string(),
            },
            UserId::new("user-1"),
        )
        .unwrap();
        projection.handle(&created).await.unwrap();

        let cancelled = domain::warehouse::operation_cancelled(
            op_id.clone(),
            tenant.clone(),
            "stock shortage",
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(2);
        projection.handle(&cancelled).await.unwrap();

        let summary = store
            .get(OPERATION_SUMMARIES, &op_id, &tenant)
            .await
            .unwrap();
        assert_eq!(summary["status"], json!("cancelled"));

        let detail = store.get(OPERATION_DETAILS, &op_id, &tenant).await.unwrap();
        assert_eq!(detail["cancelReason"], json!("stock shortage"));
        assert_eq!(detail["activityLog"][1]["action"], json!("cancelled"));
        assert_eq!(detail["activityLog"][1]["details"], json!("stock shortage"));
    }

    #[tokio::test]
    async fn first_stock_event_creates_inventory_row() {
        let (store, cache, projection) = fixture();
        let reserved = domain::warehouse::stock_reserved(
            AggregateId::new("wh-1"),
            TenantId::new("tenant-a"),
            &movement("SKU-1", 5),
            UserId::new("user-1"),
        )
        .unwrap();
        projection.handle(&reserved).await.unwrap();

        let row = store
            .get(
                INVENTORY_LEVELS,
                &AggregateId::new("wh-1:SKU-1"),
                &TenantId::new("tenant-a"),
            )
            .await
            .unwrap();
        assert_eq!(row["warehouseId"], json!("wh-1"));
        assert_eq!(row["productId"], json!("SKU-1"));
        assert_eq!(row["reserved"], json!(5));
        assert!(row.get("onHand").is_none());

        assert_eq!(
            cache.deleted_keys().await,
            vec!["inventory:detail:wh-1:SKU-1", "inventory:summary:wh-1:SKU-1"]
        );
    }

    #[tokio::test]
    async fn commit_moves_stock_out_of_reservation_and_on_hand() {
        let (store, _, projection) = fixture();
        let warehouse_id = AggregateId::new("wh-1");
        let tenant = TenantId::new("tenant-a");

        let adjusted = domain::warehouse::inventory_adjusted(
            warehouse_id.clone(),
            tenant.clone(),
            &InventoryAdjusted {
                product_id: "SKU-1".to_string(),
                previous_quantity: 0,
                new_quantity: 20,
                reason: "initial count".to_string(),
            },
            UserId::new("user-1"),
        )
        .unwrap();
        projection.handle(&adjusted).await.unwrap();

        let reserved = domain::warehouse::stock_reserved(
            warehouse_id.clone(),
            tenant.clone(),
            &movement("SKU-1", 5),
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(2);
        projection.handle(&reserved).await.unwrap();

        let committed = domain::warehouse::stock_committed(
            warehouse_id.clone(),
            tenant.clone(),
            &movement("SKU-1", 3),
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(3);
        projection.handle(&committed).await.unwrap();

        let released = domain::warehouse::stock_released(
            warehouse_id.clone(),
            tenant.clone(),
            &movement("SKU-1", 2),
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(4);
        projection.handle(&released).await.unwrap();

        let row = store
            .get(INVENTORY_LEVELS, &AggregateId::new("wh-1:SKU-1"), &tenant)
            .await
            .unwrap();
        assert_eq!(row["onHand"], json!(17));
        assert_eq!(row["reserved"], json!(0));
        assert_eq!(row["movements"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_stock_delivery_does_not_double_apply() {
        let (store, _, projection) = fixture();
        let reserved = domain::warehouse::stock_reserved(
            AggregateId::new("wh-1"),
            TenantId::new("tenant-a"),
            &movement("SKU-1", 5),
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(2);

        projection.handle(&reserved).await.unwrap();
        projection.handle(&reserved).await.unwrap();

        let row = store
            .get(
                INVENTORY_LEVELS,
                &AggregateId::new("wh-1:SKU-1"),
                &TenantId::new("tenant-a"),
            )
            .await
            .unwrap();
        assert_eq!(row["reserved"], json!(5));
    }
}
