//! # Queue Message Structures
//!
//! Envelope types shared by every queue provider. Providers move opaque bytes;
//! typed payloads implement [`QueueMessage`] and are decoded at the consumer.

use super::errors::{MessagingError, MessagingResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-assigned message identifier, stable across redeliveries
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle for one delivery of a message; changes on every redelivery
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptHandle(pub String);

impl fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One delivery of a message
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedMessage<T> {
    pub message_id: MessageId,
    pub receipt: ReceiptHandle,
    /// Deliveries so far, including this one
    pub receive_count: u32,
    pub sent_at: DateTime<Utc>,
    pub payload: T,
}

pub type RawMessage = QueuedMessage<Vec<u8>>;

impl RawMessage {
    /// Decode the payload, keeping the delivery metadata
    pub fn decode<T: QueueMessage>(&self) -> MessagingResult<QueuedMessage<T>> {
        Ok(QueuedMessage {
            message_id: self.message_id.clone(),
            receipt: self.receipt.clone(),
            receive_count: self.receive_count,
            sent_at: self.sent_at,
            payload: T::from_bytes(&self.payload)?,
        })
    }
}

/// Payloads carried on a tenant queue
pub trait QueueMessage: Serialize + DeserializeOwned + Send + Sync {
    fn to_bytes(&self) -> MessagingResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| MessagingError::message_serialization(e.to_string()))
    }

    fn from_bytes(bytes: &[u8]) -> MessagingResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| MessagingError::message_deserialization(e.to_string()))
    }
}

/// Counters for one queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub visible: usize,
    pub in_flight: usize,
    pub dead_lettered: usize,
}
