use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a tenant, the isolation boundary for every read-model row.
///
/// Wraps a plain string so producer-assigned tenant identifiers round-trip
/// unchanged through the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Creates a tenant ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when the identifier is empty.
    ///
    /// An empty tenant ID is never valid on a published envelope.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier for an aggregate instance.
///
/// Aggregate IDs are assigned by the write side and may be any non-empty
/// string (UUIDs, business numbers such as `INV-2024-001`, and so on).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(String);

impl AggregateId {
    /// Creates an aggregate ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a new random (UUID v4) aggregate ID.
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AggregateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for AggregateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier for the acting user recorded on envelopes and activity entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_id_random_creates_unique_ids() {
        let id1 = AggregateId::random();
        let id2 = AggregateId::random();
        assert_ne!(id1, id2);
    }

    #[test]
    fn aggregate_id_preserves_business_identifiers() {
        let id = AggregateId::new("INV-2024-001");
        assert_eq!(id.as_str(), "INV-2024-001");
        assert_eq!(id.to_string(), "INV-2024-001");
    }

    #[test]
    fn tenant_id_empty_check() {
        assert!(TenantId::default().is_empty());
        assert!(!TenantId::new("tenant-a").is_empty());
    }

    #[test]
    fn tenant_id_serializes_as_plain_string() {
        let id = TenantId::new("tenant-a");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"tenant-a\"");
        let back: TenantId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn user_id_roundtrip() {
        let id = UserId::new("user-7");
        let json = serde_json::to_string(&id).unwrap();
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
