//! Error types for the reconciliation engine.
//!
//! Each layer owns a `thiserror` enum (validation, storage, messaging, external
//! services, configuration). [`ChangeflowError`] unifies them so the queue
//! consumer can decide an event's disposition from [`ChangeflowError::category`].

use crate::config::ConfigurationError;
use crate::messaging::MessagingError;
use crate::services::ServiceError;
use crate::storage::StorageError;
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChangeflowError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Operation {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },
    #[error("Archive update for {object_id} abandoned after {attempts} conflicting writes")]
    ConcurrencyExhausted { object_id: String, attempts: u32 },
}

/// How an error affects the event that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed input; retrying cannot help and the event is dead-lettered
    Validation,
    /// Infrastructure hiccup; the event is redelivered with backoff
    Transient,
    /// Non-retryable failure that is not a validation problem
    Fatal,
}

impl ChangeflowError {
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Configuration(_) => false,
            Self::Storage(err) => err.is_retryable(),
            Self::Messaging(err) => err.is_retryable(),
            Self::Service(err) => err.is_retryable(),
            Self::Timeout { .. } | Self::ConcurrencyExhausted { .. } => true,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            _ if self.is_retryable() => ErrorCategory::Transient,
            _ => ErrorCategory::Fatal,
        }
    }
}

pub type Result<T> = std::result::Result<T, ChangeflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_never_retried() {
        let err: ChangeflowError = ValidationError::LegacyStatusField {
            object_id: "CHG-1".to_string(),
            field: "last_action".to_string(),
        }
        .into();
        assert!(!err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn test_timeouts_are_transient() {
        let err = ChangeflowError::timeout("archive.get", 5000);
        assert!(err.is_retryable());
        assert_eq!(err.category(), ErrorCategory::Transient);
        assert!(err.to_string().contains("archive.get"));
    }

    #[test]
    fn test_rejected_service_call_is_fatal() {
        let err: ChangeflowError = ServiceError::rejected("meetings", "subject too long").into();
        assert_eq!(err.category(), ErrorCategory::Fatal);
    }

    #[test]
    fn test_storage_unavailability_is_transient() {
        let err: ChangeflowError =
            StorageError::unavailable("put", "archive/CHG-1.json", "503 Slow Down").into();
        assert_eq!(err.category(), ErrorCategory::Transient);
    }
}
