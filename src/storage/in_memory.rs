//! # In-Memory Object Store
//!
//! Process-local [`ObjectStore`] with etags, conditional writes and a write
//! notification feed. Faults can be injected per operation and key prefix to
//! exercise the retry paths.

use super::errors::{StorageError, StorageResult};
use super::traits::{ObjectMetadata, ObjectStore, StoredObject, WriteCondition};
use crate::events::StorageEvent;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

const NOTIFICATION_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    Head,
    Get,
    Put,
    Delete,
}

/// An injected failure, consumed `remaining` times
#[derive(Debug, Clone)]
pub struct StoreFault {
    pub operation: StoreOperation,
    pub key_prefix: String,
    pub error: StorageError,
    pub remaining: u32,
}

#[derive(Debug)]
pub struct InMemoryObjectStore {
    objects: DashMap<String, StoredObject>,
    faults: Mutex<Vec<StoreFault>>,
    etag_counter: AtomicU64,
    notifications: broadcast::Sender<StorageEvent>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            objects: DashMap::new(),
            faults: Mutex::new(Vec::new()),
            etag_counter: AtomicU64::new(1),
            notifications,
        }
    }

    /// Write and delete notifications, as a bucket event configuration would
    /// deliver them
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.notifications.subscribe()
    }

    pub fn inject_fault(&self, fault: StoreFault) {
        self.faults.lock().push(fault);
    }

    /// Fail the next `times` calls of `operation` on keys under `key_prefix`
    pub fn fail_next(
        &self,
        operation: StoreOperation,
        key_prefix: &str,
        error: StorageError,
        times: u32,
    ) {
        self.inject_fault(StoreFault {
            operation,
            key_prefix: key_prefix.to_string(),
            error,
            remaining: times,
        });
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    fn take_fault(&self, operation: StoreOperation, key: &str) -> StorageResult<()> {
        let mut faults = self.faults.lock();
        let Some(index) = faults
            .iter()
            .position(|fault| fault.operation == operation && key.starts_with(&fault.key_prefix))
        else {
            return Ok(());
        };

        let error = faults[index].error.clone();
        faults[index].remaining = faults[index].remaining.saturating_sub(1);
        if faults[index].remaining == 0 {
            faults.remove(index);
        }
        debug!(operation = ?operation, key = %key, error = %error, "Injected store fault");
        Err(error)
    }

    fn next_etag(&self) -> String {
        format!("\"{:016x}\"", self.etag_counter.fetch_add(1, Ordering::Relaxed))
    }

    fn notify(&self, event: StorageEvent) {
        // No subscribers is fine
        let _ = self.notifications.send(event);
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

fn condition_holds(current: Option<&StoredObject>, condition: &WriteCondition) -> bool {
    match (condition, current) {
        (WriteCondition::None, _) => true,
        (WriteCondition::IfNoneMatch, existing) => existing.is_none(),
        (WriteCondition::IfMatch(etag), Some(existing)) => &existing.metadata.etag == etag,
        (WriteCondition::IfMatch(_), None) => false,
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMetadata>> {
        self.take_fault(StoreOperation::Head, key)?;
        Ok(self.objects.get(key).map(|entry| entry.metadata.clone()))
    }

    async fn get(&self, key: &str) -> StorageResult<Option<StoredObject>> {
        self.take_fault(StoreOperation::Get, key)?;
        Ok(self.objects.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        condition: WriteCondition,
        writer: &str,
    ) -> StorageResult<ObjectMetadata> {
        self.take_fault(StoreOperation::Put, key)?;

        let metadata = ObjectMetadata {
            key: key.to_string(),
            etag: self.next_etag(),
            size: body.len(),
            last_modified: Utc::now(),
        };
        let stored = StoredObject {
            metadata: metadata.clone(),
            body,
        };

        match self.objects.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if !condition_holds(Some(occupied.get()), &condition) {
                    return Err(StorageError::precondition_failed("put", key));
                }
                occupied.insert(stored);
            }
            Entry::Vacant(vacant) => {
                if !condition_holds(None, &condition) {
                    return Err(StorageError::precondition_failed("put", key));
                }
                vacant.insert(stored);
            }
        }

        self.notify(
            StorageEvent::created(key, Some(writer.to_string())).with_etag(metadata.etag.clone()),
        );
        Ok(metadata)
    }

    async fn delete(
        &self,
        key: &str,
        condition: WriteCondition,
        writer: &str,
    ) -> StorageResult<bool> {
        self.take_fault(StoreOperation::Delete, key)?;

        let removed = match self.objects.entry(key.to_string()) {
            Entry::Occupied(occupied) => {
                if !condition_holds(Some(occupied.get()), &condition) {
                    return Err(StorageError::precondition_failed("delete", key));
                }
                occupied.remove();
                true
            }
            Entry::Vacant(_) => false,
        };

        if removed {
            self.notify(StorageEvent::removed(key, Some(writer.to_string())));
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StorageEventKind;

    const WRITER: &str = "ops@example.com";

    #[tokio::test]
    async fn test_conditional_put() {
        let store = InMemoryObjectStore::new();
        let first = store
            .put("archive/A.json", b"1".to_vec(), WriteCondition::IfNoneMatch, WRITER)
            .await
            .unwrap();
        assert!(store
            .put("archive/A.json", b"2".to_vec(), WriteCondition::IfNoneMatch, WRITER)
            .await
            .is_err());

        let second = store
            .put(
                "archive/A.json",
                b"2".to_vec(),
                WriteCondition::IfMatch(first.etag.clone()),
                WRITER,
            )
            .await
            .unwrap();
        assert_ne!(first.etag, second.etag);

        let stale = store
            .put(
                "archive/A.json",
                b"3".to_vec(),
                WriteCondition::IfMatch(first.etag),
                WRITER,
            )
            .await
            .unwrap_err();
        assert!(stale.is_precondition_failed());
    }

    #[tokio::test]
    async fn test_delete_semantics() {
        let store = InMemoryObjectStore::new();
        assert!(!store
            .delete("customers/acme/A.json", WriteCondition::None, WRITER)
            .await
            .unwrap());

        let meta = store
            .put("customers/acme/A.json", b"{}".to_vec(), WriteCondition::None, WRITER)
            .await
            .unwrap();
        assert!(store
            .delete(
                "customers/acme/A.json",
                WriteCondition::IfMatch("\"other\"".to_string()),
                WRITER
            )
            .await
            .is_err());
        assert!(store
            .delete("customers/acme/A.json", WriteCondition::IfMatch(meta.etag), WRITER)
            .await
            .unwrap());
        assert!(store.head("customers/acme/A.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_notifications_carry_writer() {
        let store = InMemoryObjectStore::new();
        let mut events = store.subscribe();

        store
            .put("customers/acme/A.json", b"{}".to_vec(), WriteCondition::None, WRITER)
            .await
            .unwrap();
        store
            .delete("customers/acme/A.json", WriteCondition::None, "engine")
            .await
            .unwrap();

        let created = events.recv().await.unwrap();
        assert_eq!(created.event_kind, StorageEventKind::ObjectCreated);
        assert_eq!(created.writer_identity.as_deref(), Some(WRITER));
        let removed = events.recv().await.unwrap();
        assert_eq!(removed.event_kind, StorageEventKind::ObjectRemoved);
    }

    #[tokio::test]
    async fn test_injected_fault_is_consumed() {
        let store = InMemoryObjectStore::new();
        store.fail_next(
            StoreOperation::Put,
            "archive/",
            StorageError::unavailable("put", "archive/", "503"),
            1,
        );

        assert!(store
            .put("archive/A.json", b"1".to_vec(), WriteCondition::None, WRITER)
            .await
            .is_err());
        assert!(store
            .put("customers/acme/A.json", b"1".to_vec(), WriteCondition::None, WRITER)
            .await
            .is_ok());
        assert!(store
            .put("archive/A.json", b"1".to_vec(), WriteCondition::None, WRITER)
            .await
            .is_ok());
    }
}
