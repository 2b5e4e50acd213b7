//! Document aggregate family.

use common::{AggregateId, TenantId, UserId};
use events::{EventData, EventEnvelope};
use serde::{Deserialize, Serialize};

pub const AGGREGATE_TYPE: &str = "Document";

pub const DOCUMENT_UPLOADED: &str = "document.uploaded";
pub const DOCUMENT_PROCESSING: &str = "document.processing";
pub const DOCUMENT_COMPLETED: &str = "document.completed";
pub const DOCUMENT_FAILED: &str = "document.failed";
pub const DOCUMENT_INDEXED: &str = "document.indexed";
pub const DOCUMENT_DEINDEXED: &str = "document.deindexed";

/// Document processing pipeline: `uploaded → processing → completed/failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "uploaded",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }
}

/// Write-side document snapshot used to construct events.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: AggregateId,
    pub tenant_id: TenantId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
}

/// Payload for `document.uploaded`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUploaded {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size_bytes: i64,
    #[serde(default)]
    pub storage_key: String,
}

/// Payload for `document.completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCompleted {
    #[serde(default)]
    pub page_count: i64,
}

/// Payload for `document.failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFailed {
    #[serde(default)]
    pub reason: String,
}

/// Payload for `document.indexed` and `document.deindexed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentIndexed {
    #[serde(default)]
    pub index_name: String,
}

pub fn document_uploaded(
    document: &Document,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = DocumentUploaded {
        name: document.name.clone(),
        mime_type: document.mime_type.clone(),
        size_bytes: document.size_bytes,
        storage_key: document.storage_key.clone(),
    };
    Ok(EventEnvelope::new(
        document.id.clone(),
        AGGREGATE_TYPE,
        DOCUMENT_UPLOADED,
        document.tenant_id.clone(),
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn document_processing(
    document_id: AggregateId,
    tenant_id: TenantId,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    Ok(EventEnvelope::new(
        document_id,
        AGGREGATE_TYPE,
        DOCUMENT_PROCESSING,
        tenant_id,
        user_id,
        EventData::new(),
    ))
}

pub fn document_completed(
    document_id: AggregateId,
    tenant_id: TenantId,
    page_count: i64,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = DocumentCompleted { page_count };
    Ok(EventEnvelope::new(
        document_id,
        AGGREGATE_TYPE,
        DOCUMENT_COMPLETED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn document_failed(
    document_id: AggregateId,
    tenant_id: TenantId,
    reason: impl Into<String>,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = DocumentFailed {
        reason: reason.into(),
    };
    Ok(EventEnvelope::new(
        document_id,
        AGGREGATE_TYPE,
        DOCUMENT_FAILED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn document_indexed(
    document_id: AggregateId,
    tenant_id: TenantId,
    index_name: impl Into<String>,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = DocumentIndexed {
        index_name: index_name.into(),
    };
    Ok(EventEnvelope::new(
        document_id,
        AGGREGATE_TYPE,
        DOCUMENT_INDEXED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}

pub fn document_deindexed(
    document_id: AggregateId,
    tenant_id: TenantId,
    index_name: impl Into<String>,
    user_id: UserId,
) -> Result<EventEnvelope, serde_json::Error> {
    let payload = DocumentIndexed {
        index_name: index_name.into(),
    };
    Ok(EventEnvelope::new(
        document_id,
        AGGREGATE_TYPE,
        DOCUMENT_DEINDEXED,
        tenant_id,
        user_id,
        EventData::from_serialize(&payload)?,
    ))
}
