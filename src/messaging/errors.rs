//! # Messaging Error Types
//!
//! Structured errors for tenant queue operations using thiserror instead of
//! `Box<dyn Error>` patterns.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    #[error("Queue operation failed: {queue_name}: {operation}: {message}")]
    QueueOperation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("Queue not found: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("Queue {queue_name} is throttling requests")]
    Throttled { queue_name: String },

    #[error("Receipt handle no longer valid for queue {queue_name}: {receipt}")]
    ReceiptInvalid { queue_name: String, receipt: String },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Message deserialization error: {message}")]
    MessageDeserialization { message: String },

    #[error("Invalid queue name: {queue_name}: {reason}")]
    InvalidQueueName { queue_name: String, reason: String },
}

impl MessagingError {
    /// Create a queue operation error
    pub fn queue_operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a queue not found error
    pub fn queue_not_found(queue_name: impl Into<String>) -> Self {
        Self::QueueNotFound {
            queue_name: queue_name.into(),
        }
    }

    pub fn receipt_invalid(queue_name: impl Into<String>, receipt: impl Into<String>) -> Self {
        Self::ReceiptInvalid {
            queue_name: queue_name.into(),
            receipt: receipt.into(),
        }
    }

    /// Create a message serialization error
    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    /// Create a message deserialization error
    pub fn message_deserialization(message: impl Into<String>) -> Self {
        Self::MessageDeserialization {
            message: message.into(),
        }
    }

    /// Create an invalid queue name error
    pub fn invalid_queue_name(queue_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidQueueName {
            queue_name: queue_name.into(),
            reason: reason.into(),
        }
    }

    /// Failures of the queue itself are retryable; malformed messages and
    /// stale receipts are not
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::QueueOperation { .. } | Self::Throttled { .. }
        )
    }
}

/// Conversion from serde_json::Error to MessagingError
impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() || err.is_data() || err.is_eof() {
            MessagingError::message_deserialization(err.to_string())
        } else {
            MessagingError::message_serialization(err.to_string())
        }
    }
}

/// Result type alias for messaging operations
pub type MessagingResult<T> = Result<T, MessagingError>;
