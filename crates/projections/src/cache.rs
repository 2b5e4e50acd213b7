//! Cache invalidation contract and in-memory double.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Result;

/// Key/pattern invalidation target consumed by the projection handlers.
///
/// Invalidation is best-effort: deleting a key that is not cached is not
/// an error.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Deletes one key.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Deletes every key matching a glob pattern (`*` matches any run of
    /// characters). Used for list caches, whose filter-parameterized keys
    /// cannot be enumerated cheaply.
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;
}

/// Matches a glob pattern where `*` matches any (possibly empty) run.
fn glob_match(pattern: &str, key: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    if segments.len() == 1 {
        return pattern == key;
    }

    let mut rest = key;
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(segment) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == segments.len() - 1 {
            return rest.ends_with(segment);
        } else {
            match rest.find(segment) {
                Some(pos) => rest = &rest[pos + segment.len()..],
                None => return false,
            }
        }
    }
    // Pattern ends with '*', anything left in the key is covered.
    true
}

/// In-memory cache that applies invalidations and records every call, so
/// tests can assert exactly which keys a handler invalidated.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
    deleted_keys: Arc<RwLock<Vec<String>>>,
    deleted_patterns: Arc<RwLock<Vec<String>>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a cache entry.
    pub async fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.write().await.insert(key.into(), value.into());
    }

    /// True when a key is currently cached.
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Every key passed to [`Cache::delete`], in call order.
    pub async fn deleted_keys(&self) -> Vec<String> {
        self.deleted_keys.read().await.clone()
    }

    /// Every pattern passed to [`Cache::delete_pattern`], in call order.
    pub async fn deleted_patterns(&self) -> Vec<String> {
        self.deleted_patterns.read().await.clone()
    }

    /// Clears the recorded invalidation calls, keeping cached entries.
    pub async fn reset_recording(&self) {
        self.deleted_keys.write().await.clear();
        self.deleted_patterns.write().await.clear();
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn delete(&self, key: &str) -> Result<()> {
        // A miss is not an error.
        self.entries.write().await.remove(key);
        self.deleted_keys.write().await.push(key.to_string());
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .retain(|key, _| !glob_match(pattern, key));
        self.deleted_patterns.write().await.push(pattern.to_string());
        Ok(())
    }
}
