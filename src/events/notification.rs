//! Object-store write notifications as delivered on a tenant queue.

use crate::messaging::QueueMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageEventKind {
    ObjectCreated,
    ObjectRemoved,
    #[serde(other)]
    Other,
}

/// One write notification for a trigger key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEvent {
    pub event_kind: StorageEventKind,
    pub key: String,
    /// Identity that performed the write, when the store reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer_identity: Option<String>,
    pub event_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl StorageEvent {
    pub fn created(key: impl Into<String>, writer_identity: Option<String>) -> Self {
        Self {
            event_kind: StorageEventKind::ObjectCreated,
            key: key.into(),
            writer_identity,
            event_time: Utc::now(),
            etag: None,
        }
    }

    pub fn removed(key: impl Into<String>, writer_identity: Option<String>) -> Self {
        Self {
            event_kind: StorageEventKind::ObjectRemoved,
            key: key.into(),
            writer_identity,
            event_time: Utc::now(),
            etag: None,
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn is_creation(&self) -> bool {
        self.event_kind == StorageEventKind::ObjectCreated
    }
}

impl QueueMessage for StorageEvent {}
