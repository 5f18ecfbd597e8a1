use super::errors::StorageResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Metadata returned by a probe or a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub key: String,
    pub etag: String,
    pub size: usize,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub metadata: ObjectMetadata,
    pub body: Vec<u8>,
}

/// Precondition attached to a write or delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCondition {
    None,
    /// Only if the current etag matches
    IfMatch(String),
    /// Only if the key does not exist
    IfNoneMatch,
}

/// Durable key/value object storage.
///
/// Every successful write or delete may emit an at-least-once notification
/// carrying `writer` as the writer identity.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Metadata-only existence probe
    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMetadata>>;

    async fn get(&self, key: &str) -> StorageResult<Option<StoredObject>>;

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        condition: WriteCondition,
        writer: &str,
    ) -> StorageResult<ObjectMetadata>;

    /// Returns whether an object was removed. Deleting a missing key succeeds
    /// with `false`; a failed `IfMatch` is `PreconditionFailed`.
    async fn delete(&self, key: &str, condition: WriteCondition, writer: &str)
        -> StorageResult<bool>;
}
