//! Read model store contract and its filter/patch vocabulary.

use async_trait::async_trait;
use common::{AggregateId, TenantId};
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};

use crate::Result;

/// Row selector for [`ReadModelStore::update`].
///
/// Every filter names both the row ID and the tenant: an update can never
/// match a row outside the envelope's tenant boundary. The optional
/// `applied_below` guard makes delta patches safe under redelivery: the
/// update only matches while the row's `lastAppliedVersion` is below the
/// given envelope version, so a duplicate or stale delivery matches
/// nothing and its `$push`/`$inc` deltas never apply twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub id: AggregateId,
    pub tenant_id: TenantId,
    pub applied_below: Option<i64>,
}

impl Filter {
    /// Plain `(id, tenant)` filter with no version guard.
    pub fn key(id: AggregateId, tenant_id: TenantId) -> Self {
        Self {
            id,
            tenant_id,
            applied_below: None,
        }
    }

    /// `(id, tenant)` filter that only matches rows whose
    /// `lastAppliedVersion` is below `version`.
    pub fn gated(id: AggregateId, tenant_id: TenantId, version: i64) -> Self {
        Self {
            id,
            tenant_id,
            applied_below: Some(version),
        }
    }
}

/// One `$pull` operation: remove array elements whose `match_field` equals
/// `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct PullOp {
    pub array_field: String,
    pub match_field: String,
    pub value: Value,
}

/// A `$set`/`$push`/`$pull`/`$inc` patch document, built fluently and
/// applied atomically against one row.
///
/// Increments accept integers (counters) and decimals (money amounts);
/// decimal deltas travel as decimal strings, matching how money fields are
/// stored in rows.
#[derive(Debug, Clone, Default)]
pub struct UpdateDocument {
    set: Map<String, Value>,
    push: Vec<(String, Value)>,
    pull: Vec<PullOp>,
    inc: Map<String, Value>,
    upsert: bool,
}

impl UpdateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a scalar field to an absolute value.
    pub fn set(mut self, field: impl Into<String>, value: Value) -> Self {
        self.set.insert(field.into(), value);
        self
    }

    /// Appends one element to an array field, creating the array if absent.
    pub fn push(mut self, field: impl Into<String>, value: Value) -> Self {
        self.push.push((field.into(), value));
        self
    }

    /// Removes array elements whose `match_field` equals `value`.
    pub fn pull(
        mut self,
        array_field: impl Into<String>,
        match_field: impl Into<String>,
        value: Value,
    ) -> Self {
        self.pull.push(PullOp {
            array_field: array_field.into(),
            match_field: match_field.into(),
            value,
        });
        self
    }

    /// Adds an integer delta to a counter field (absent counts as zero).
    pub fn inc(mut self, field: impl Into<String>, delta: i64) -> Self {
        self.inc.insert(field.into(), json!(delta));
        self
    }

    /// Adds a decimal delta to a money field (absent counts as zero).
    pub fn inc_decimal(mut self, field: impl Into<String>, delta: Decimal) -> Self {
        self.inc.insert(field.into(), Value::String(delta.to_string()));
        self
    }

    /// Marks the update as an upsert: when no row matches the filter's
    /// `(id, tenant)` key, a fresh row is created from the patch.
    ///
    /// When a row exists but fails the version guard, nothing is created;
    /// the guard rejecting a duplicate must not resurrect state.
    pub fn upsert(mut self) -> Self {
        self.upsert = true;
        self
    }

    pub fn sets(&self) -> &Map<String, Value> {
        &self.set
    }

    pub fn pushes(&self) -> &[(String, Value)] {
        &self.push
    }

    pub fn pulls(&self) -> &[PullOp] {
        &self.pull
    }

    pub fn incs(&self) -> &Map<String, Value> {
        &self.inc
    }

    pub fn is_upsert(&self) -> bool {
        self.upsert
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.push.is_empty() && self.pull.is_empty() && self.inc.is_empty()
    }

    /// Renders the patch in operator syntax, for store implementations that
    /// speak it directly.
    pub fn into_patch(self) -> Value {
        let mut patch = Map::new();
        if !self.set.is_empty() {
            patch.insert("$set".to_string(), Value::Object(self.set));
        }
        if !self.push.is_empty() {
            let mut grouped: Map<String, Value> = Map::new();
            for (field, value) in self.push {
                match grouped.get_mut(&field) {
                    None => {
                        grouped.insert(field, value);
                    }
                    Some(existing) => {
                        // Second push to the same field switches to $each form.
                        if let Some(each) =
                            existing.get_mut("$each").and_then(Value::as_array_mut)
                        {
                            each.push(value);
                        } else {
                            *existing = json!({ "$each": [existing.clone(), value] });
                        }
                    }
                }
            }
            patch.insert("$push".to_string(), Value::Object(grouped));
        }
        if !self.pull.is_empty() {
            let mut pulls = Map::new();
            for op in self.pull {
                pulls.insert(op.array_field, json!({ op.match_field: op.value }));
            }
            patch.insert("$pull".to_string(), Value::Object(pulls));
        }
        if !self.inc.is_empty() {
            patch.insert("$inc".to_string(), Value::Object(self.inc));
        }
        Value::Object(patch)
    }
}

/// Document-oriented read model store consumed by the projection handlers.
///
/// Implementations live outside this crate; [`crate::InMemoryReadModelStore`]
/// is the test double.
#[async_trait]
pub trait ReadModelStore: Send + Sync {
    /// Idempotent upsert keyed by the document's embedded `id`/`tenantId`.
    async fn save(&self, collection: &str, document: Value) -> Result<()>;

    /// Applies a patch atomically against the row matching `filter`.
    ///
    /// An update that matches no row is a no-op, not an error (unless the
    /// patch is an upsert and the row is absent entirely).
    async fn update(&self, collection: &str, filter: Filter, update: UpdateDocument)
    -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_operations() {
        let update = UpdateDocument::new()
            .set("status", json!("paid"))
            .push("activityLog", json!({"action": "paid"}))
            .pull("lines", "id", json!("L1"))
            .inc("lineCount", -1)
            .inc_decimal("total", Decimal::new(-5000, 2));

        assert_eq!(update.sets().get("status"), Some(&json!("paid")));
        assert_eq!(update.pushes().len(), 1);
        assert_eq!(update.pulls()[0].array_field, "lines");
        assert_eq!(update.incs().get("lineCount"), Some(&json!(-1)));
        assert_eq!(update.incs().get("total"), Some(&json!("-50.00")));
        assert!(!update.is_upsert());
        assert!(!update.is_empty());
    }

    #[test]
    fn patch_rendering_uses_operator_syntax() {
        let patch = UpdateDocument::new()
            .set("status", json!("sent"))
            .push("activityLog", json!("a"))
            .push("activityLog", json!("b"))
            .pull("lines", "id", json!("L1"))
            .inc("lineCount", 1)
            .into_patch();

        assert_eq!(patch["$set"]["status"], json!("sent"));
        assert_eq!(patch["$push"]["activityLog"]["$each"], json!(["a", "b"]));
        assert_eq!(patch["$pull"]["lines"]["id"], json!("L1"));
        assert_eq!(patch["$inc"]["lineCount"], json!(1));
    }

    #[test]
    fn gated_filter_carries_version_guard() {
        let filter = Filter::gated(AggregateId::new("inv-1"), TenantId::new("t"), 4);
        assert_eq!(filter.applied_below, Some(4));
        let plain = Filter::key(AggregateId::new("inv-1"), TenantId::new("t"));
        assert_eq!(plain.applied_below, None);
    }

    #[test]
    fn empty_update_is_empty() {
        assert!(UpdateDocument::new().is_empty());
        assert_eq!(UpdateDocument::new().into_patch(), json!({}));
    }
}
