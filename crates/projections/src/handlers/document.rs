//! Document projection: processing pipeline plus search-index state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, TenantId};
use domain::document::{
    self, DocumentCompleted, DocumentFailed, DocumentIndexed, DocumentStatus, DocumentUploaded,
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
use crate::store::{ReadModelStore, UpdateDocument};

pub const SUMMARIES: &str = "document_summaries";
pub const DETAILS: &str = "document_details";
const FAMILY: &str = "document";

/// List-optimized document row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummaryRow {
    pub id: AggregateId,
    pub tenant_id: TenantId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub status: DocumentStatus,
    pub indexed: bool,
    pub last_applied_version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full document view with storage and pipeline details.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetailRow {
    #[serde(flatten)]
    pub summary: DocumentSummaryRow,
    #[serde(default)]
    pub storage_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    pub activity_log: Vec<ActivityEntry>,
}

/// Projects document events into the document read models.
pub struct DocumentProjection {
    store: Arc<dyn ReadModelStore>,
    cache: Arc<dyn Cache>,
}

impl DocumentProjection {
    pub const EVENT_TYPES: &'static [&'static str] = &[
        document::DOCUMENT_UPLOADED,
        document::DOCUMENT_PROCESSING,
        document::DOCUMENT_COMPLETED,
        document::DOCUMENT_FAILED,
        document::DOCUMENT_INDEXED,
        document::DOCUMENT_DEINDEXED,
    ];

    pub fn new(store: Arc<dyn ReadModelStore>, cache: Arc<dyn Cache>) -> Self {
        Self { store, cache }
    }

    /// Registers this projection for every document event type.
    pub fn register(self: Arc<Self>, registry: &mut HandlerRegistry) {
        registry.register_all(Self::EVENT_TYPES, self);
    }

    async fn on_uploaded(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: DocumentUploaded = envelope.data.decode()?;
        let summary = DocumentSummaryRow {
            id: envelope.aggregate_id.clone(),
            tenant_id: envelope.tenant_id.clone(),
            name: payload.name,
            mime_type: payload.mime_type,
            size_bytes: payload.size_bytes,
            status: DocumentStatus::Uploaded,
            indexed: false,
            last_applied_version: envelope.version,
            created_at: envelope.timestamp,
            updated_at: envelope.timestamp,
        };
        let detail = DocumentDetailRow {
            summary: summary.clone(),
            storage_key: payload.storage_key,
            page_count: None,
            processed_at: None,
            failure_reason: None,
            index_name: None,
            activity_log: vec![ActivityEntry::from_envelope(envelope, "uploaded", "")],
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

    async fn transition(
        &self,
        envelope: &EventEnvelope,
        status: DocumentStatus,
        action: &str,
        details: String,
        extra: impl Fn(UpdateDocument) -> UpdateDocument,
    ) -> Result<()> {
        let summary = stamped(
            UpdateDocument::new().set("status", json!(status)),
            envelope,
        );
        let detail = stamped(
            extra(UpdateDocument::new().set("status", json!(status))).push(
                "activityLog",
                ActivityEntry::from_envelope(envelope, action, details).to_value()?,
            ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }

    async fn on_processing(&self, envelope: &EventEnvelope) -> Result<()> {
        self.transition(
            envelope,
            DocumentStatus::Processing,
            "processing",
            String::new(),
            |update| update,
        )
        .await
    }

    async fn on_completed(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: DocumentCompleted = envelope.data.decode()?;
        let processed_at = envelope.timestamp;
        self.transition(
            envelope,
            DocumentStatus::Completed,
            "completed",
            format!("{} pages", payload.page_count),
            |update| {
                update
                    .set("pageCount", json!(payload.page_count))
                    .set("processedAt", json!(processed_at))
            },
        )
        .await
    }

    async fn on_failed(&self, envelope: &EventEnvelope) -> Result<()> {
        let payload: DocumentFailed = envelope.data.decode()?;
        self.transition(
            envelope,
            DocumentStatus::Failed,
            "failed",
            payload.reason.clone(),
            |update| update.set("failureReason", json!(payload.reason)),
        )
        .await
    }

    /// Index membership is orthogonal to pipeline status, so these updates
    /// leave `status` untouched.
    async fn on_index_changed(&self, envelope: &EventEnvelope, indexed: bool) -> Result<()> {
        let payload: DocumentIndexed = envelope.data.decode()?;
        let action = if indexed { "indexed" } else { "deindexed" };

        let summary = stamped(
            UpdateDocument::new().set("indexed", json!(indexed)),
            envelope,
        );
        let detail = stamped(
            UpdateDocument::new()
                .set("indexed", json!(indexed))
                .set("indexName", json!(payload.index_name))
                .push(
                    "activityLog",
                    ActivityEntry::from_envelope(envelope, action, payload.index_name.clone())
                        .to_value()?,
                ),
            envelope,
        );

        self.store.update(SUMMARIES, gated_filter(envelope), summary).await?;
        self.store.update(DETAILS, gated_filter(envelope), detail).await
    }
}

#[async_trait]
impl EventHandler for DocumentProjection {
    fn name(&self) -> &'static str {
        "DocumentProjection"
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<()> {
        match envelope.event_type.as_str() {
            document::DOCUMENT_UPLOADED => self.on_uploaded(envelope).await?,
            document::DOCUMENT_PROCESSING => self.on_processing(envelope).await?,
            document::DOCUMENT_COMPLETED => self.on_completed(envelope).await?,
            document::DOCUMENT_FAILED => self.on_failed(envelope).await?,
            document::DOCUMENT_INDEXED => self.on_index_changed(envelope, true).await?,
            document::DOCUMENT_DEINDEXED => self.on_index_changed(envelope, false).await?,
            _ => return Ok(()),
        }
        invalidate_entity(self.cache.as_ref(), FAMILY, &envelope.aggregate_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::memory::InMemoryReadModelStore;
    use common::UserId;
    use domain::document::Document;

    fn sample_document() -> Document {
        Document {
            id: AggregateId::new("doc-1"),
            tenant_id: TenantId::new("tenant-a"),
            name: "invoice.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size_bytes: 48_213,
            storage_key: "tenant-a/doc-1".to_string(),
        }
    }

    async fn uploaded_fixture(
    ) -> (Arc<InMemoryReadModelStore>, Arc<InMemoryCache>, DocumentProjection) {
        let store = Arc::new(InMemoryReadModelStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let projection = DocumentProjection::new(store.clone(), cache.clone());
        let uploaded =
            domain::document::document_uploaded(&sample_document(), UserId::new("user-1"))
                .unwrap();
        projection.handle(&uploaded).await.unwrap();
        (store, cache, projection)
    }

    #[tokio::test]
    async fn uploaded_seeds_rows() {
        let (store, _, _) = uploaded_fixture().await;
        let summary = store
            .get(SUMMARIES, &AggregateId::new("doc-1"), &TenantId::new("tenant-a"))
            .await
            .unwrap();
        assert_eq!(summary["status"], json!("uploaded"));
        assert_eq!(summary["indexed"], json!(false));
        assert_eq!(summary["sizeBytes"], json!(48_213));

        let detail = store
            .get(DETAILS, &AggregateId::new("doc-1"), &TenantId::new("tenant-a"))
            .await
            .unwrap();
        assert_eq!(detail["storageKey"], json!("tenant-a/doc-1"));
    }

    #[tokio::test]
    async fn pipeline_reaches_completed_with_page_count() {
        let (store, _, projection) = uploaded_fixture().await;
        let processing = domain::document::document_processing(
            AggregateId::new("doc-1"),
            TenantId::new("tenant-a"),
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(2);
        projection.handle(&processing).await.unwrap();

        let completed = domain::document::document_completed(
            AggregateId::new("doc-1"),
            TenantId::new("tenant-a"),
            14,
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(3);
        projection.handle(&completed).await.unwrap();

        let detail = store
            .get(DETAILS, &AggregateId::new("doc-1"), &TenantId::new("tenant-a"))
            .await
            .unwrap();
        assert_eq!(detail["status"], json!("completed"));
        assert_eq!(detail["pageCount"], json!(14));
        assert!(detail["processedAt"].as_str().is_some());
        assert_eq!(detail["activityLog"][2]["details"], json!("14 pages"));
    }

    #[tokio::test]
    async fn failure_records_reason() {
        let (store, _, projection) = uploaded_fixture().await;
        let failed = domain::document::document_failed(
            AggregateId::new("doc-1"),
            TenantId::new("tenant-a"),
            "corrupt file",
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(2);
        projection.handle(&failed).await.unwrap();

        let detail = store
            .get(DETAILS, &AggregateId::new("doc-1"), &TenantId::new("tenant-a"))
            .await
            .unwrap();
        assert_eq!(detail["status"], json!("failed"));
        assert_eq!(detail["failureReason"], json!("corrupt file"));
    }

    #[tokio::test]
    async fn index_membership_toggles_without_touching_status() {
        let (store, _, projection) = uploaded_fixture().await;
        let indexed = domain::document::document_indexed(
            AggregateId::new("doc-1"),
            TenantId::new("tenant-a"),
            "documents-v2",
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(2);
        projection.handle(&indexed).await.unwrap();

        let summary = store
            .get(SUMMARIES, &AggregateId::new("doc-1"), &TenantId::new("tenant-a"))
            .await
            .unwrap();
        assert_eq!(summary["indexed"], json!(true));
        assert_eq!(summary["status"], json!("uploaded"));

        let deindexed = domain::document::document_deindexed(
            AggregateId::new("doc-1"),
            TenantId::new("tenant-a"),
            "documents-v2",
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(3);
        projection.handle(&deindexed).await.unwrap();

        let detail = store
            .get(DETAILS, &AggregateId::new("doc-1"), &TenantId::new("tenant-a"))
            .await
            .unwrap();
        assert_eq!(detail["indexed"], json!(false));
        assert_eq!(detail["activityLog"][2]["action"], json!("deindexed"));
    }

    #[tokio::test]
    async fn stale_redelivery_is_ignored() {
        let (store, cache, projection) = uploaded_fixture().await;
        let processing = domain::document::document_processing(
            AggregateId::new("doc-1"),
            TenantId::new("tenant-a"),
            UserId::new("user-1"),
        )
        .unwrap()
        .with_version(2);
        projection.handle(&processing).await.unwrap();
        cache.reset_recording().await;

        // Same version again: the row keeps a single "processing" entry.
        projection.handle(&processing).await.unwrap();

        let detail = store
            .get(DETAILS, &AggregateId::new("doc-1"), &TenantId::new("tenant-a"))
            .await
            .unwrap();
        assert_eq!(detail["activityLog"].as_array().unwrap().len(), 2);
        // Cache invalidation still runs on redelivery.
        assert_eq!(
            cache.deleted_keys().await,
            vec!["document:detail:doc-1", "document:summary:doc-1"]
        );
    }
}
