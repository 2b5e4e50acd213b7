//! In-memory read model store for tests and benches.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AggregateId, TenantId};
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::error::{ProjectionError, Result};
use crate::store::{Filter, ReadModelStore, UpdateDocument};

type RowKey = (String, String, String); // (collection, id, tenant)

/// In-memory document store applying the same filter+patch semantics as a
/// production document store.
///
/// Rows are keyed by `(collection, id, tenant)`, so a filter carrying the
/// wrong tenant can never touch another tenant's row. Each update runs
/// under one write guard, giving per-document atomicity and nothing more.
#[derive(Clone, Default)]
pub struct InMemoryReadModelStore {
    rows: Arc<RwLock<HashMap<RowKey, Value>>>,
}

impl InMemoryReadModelStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches one row.
    pub async fn get(
        &self,
        collection: &str,
        id: &AggregateId,
        tenant_id: &TenantId,
    ) -> Option<Value> {
        self.rows
            .read()
            .await
            .get(&row_key(collection, id.as_str(), tenant_id.as_str()))
            .cloned()
    }

    /// Number of rows in a collection, across all tenants.
    pub async fn count(&self, collection: &str) -> usize {
        self.rows
            .read()
            .await
            .keys()
            .filter(|(c, _, _)| c == collection)
            .count()
    }

    /// Drops every row. Used before a rebuild-from-replay.
    pub async fn clear(&self) {
        self.rows.write().await.clear();
    }
}

fn row_key(collection: &str, id: &str, tenant: &str) -> RowKey {
    (collection.to_string(), id.to_string(), tenant.to_string())
}

fn apply_patch(row: &mut Value, update: &UpdateDocument) -> Result<()> {
    let object = row
        .as_object_mut()
        .ok_or_else(|| ProjectionError::Store("row is not an object".to_string()))?;

    for (field, value) in update.sets() {
        object.insert(field.clone(), value.clone());
    }

    for op in update.pulls() {
        if let Some(array) = object.get_mut(&op.array_field).and_then(Value::as_array_mut) {
            array.retain(|element| element.get(&op.match_field) != Some(&op.value));
        }
    }

    for (field, value) in update.pushes() {
        match object.get_mut(field).and_then(Value::as_array_mut) {
            Some(array) => array.push(value.clone()),
            None => {
                object.insert(field.clone(), json!([value]));
            }
        }
    }

    for (field, delta) in update.incs() {
        let current = object.get(field);
        let next = match delta {
            Value::Number(n) => {
                let delta = n.as_i64().unwrap_or(0);
                let current = current.and_then(Value::as_i64).unwrap_or(0);
                json!(current + delta)
            }
            Value::String(s) => {
                let delta: rust_decimal::Decimal = s.parse().map_err(|_| {
                    ProjectionError::Store(format!("non-decimal $inc delta for {field}: {s}"))
                })?;
                let current = current
                    .and_then(Value::as_str)
                    .and_then(|v| v.parse::<rust_decimal::Decimal>().ok())
                    .unwrap_or_default();
                Value::String((current + delta).to_string())
            }
            other => {
                return Err(ProjectionError::Store(format!(
                    "unsupported $inc delta for {field}: {other}"
                )));
            }
        };
        object.insert(field.clone(), next);
    }

    Ok(())
}

#[async_trait]
impl ReadModelStore for InMemoryReadModelStore {
    async fn save(&self, collection: &str, document: Value) -> Result<()> {
        let id = document
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ProjectionError::Store("document has no id".to_string()))?
            .to_string();
        let tenant = document
            .get("tenantId")
            .and_then(Value::as_str)
            .ok_or_else(|| ProjectionError::Store("document has no tenantId".to_string()))?
            .to_string();
        if tenant.is_empty() {
            return Err(ProjectionError::Store("document has empty tenantId".to_string()));
        }

        self.rows
            .write()
            .await
            .insert(row_key(collection, &id, &tenant), document);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        filter: Filter,
        update: UpdateDocument,
    ) -> Result<()> {
        let key = row_key(collection, filter.id.as_str(), filter.tenant_id.as_str());
        let mut rows = self.rows.write().await;

        match rows.get_mut(&key) {
            Some(row) => {
                if let Some(below) = filter.applied_below {
                    let applied = row
                        .get("lastAppliedVersion")
                        .and_then(Value::as_i64)
                        .unwrap_or(0);
                    if applied >= below {
                        // Duplicate or stale delivery; deltas must not reapply.
                        return Ok(());
                    }
                }
                apply_patch(row, &update)
            }
            None if update.is_upsert() => {
                let mut row = json!({
                    "id": filter.id.as_str(),
                    "tenantId": filter.tenant_id.as_str(),
                });
                apply_patch(&mut row, &update)?;
                rows.insert(key, row);
                Ok(())
            }
            None => Ok(()),
        }
    }
}
