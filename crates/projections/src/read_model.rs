//! Shared read-model vocabulary: activity log entries and cache keys.

use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use events::EventEnvelope;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::cache::Cache;

/// One entry in a Detail row's append-only activity log.
///
/// The activity log is a derived audit trail, not a source of truth; rows
/// are rebuilt from the event stream, log included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: UserId,
    #[serde(default)]
    pub details: String,
}

impl ActivityEntry {
    /// Builds an entry stamped with the envelope's timestamp and actor.
    pub fn from_envelope(
        envelope: &EventEnvelope,
        action: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            timestamp: envelope.timestamp,
            user_id: envelope.user_id.clone(),
            details: details.into(),
        }
    }

    /// The entry as a JSON value, ready for a `$push`.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Per-entity summary cache key: `<family>:summary:<id>`.
pub fn summary_key(family: &str, id: &AggregateId) -> String {
    format!("{family}:summary:{id}")
}

/// Per-entity detail cache key: `<family>:detail:<id>`.
pub fn detail_key(family: &str, id: &AggregateId) -> String {
    format!("{family}:detail:{id}")
}

/// List cache glob: `<family>:list:*`. List keys are parameterized by
/// query filters the invalidator cannot enumerate, so lists are always
/// pattern-invalidated.
pub fn list_pattern(family: &str) -> String {
    format!("{family}:list:*")
}

/// Standard invalidation after a successful row mutation: both per-entity
/// keys plus the family's list caches.
pub async fn invalidate_entity(cache: &dyn Cache, family: &str, id: &AggregateId) -> Result<()> {
    cache.delete(&detail_key(family, id)).await?;
    cache.delete(&summary_key(family, id)).await?;
    cache.delete_pattern(&list_pattern(family)).await
}
