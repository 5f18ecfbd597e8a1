use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Object not found: {key}")]
    NotFound { key: String },

    #[error("Conditional {operation} failed for {key}")]
    PreconditionFailed { operation: String, key: String },

    #[error("Object store unavailable during {operation} on {key}: {message}")]
    Unavailable {
        operation: String,
        key: String,
        message: String,
    },

    #[error("Object store throttled {operation} on {key}")]
    Throttled { operation: String, key: String },

    #[error("Stored object {key} could not be encoded: {message}")]
    Serialization { key: String, message: String },
}

impl StorageError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn precondition_failed(operation: impl Into<String>, key: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            operation: operation.into(),
            key: key.into(),
        }
    }

    pub fn unavailable(
        operation: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Unavailable {
            operation: operation.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn throttled(operation: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Throttled {
            operation: operation.into(),
            key: key.into(),
        }
    }

    /// A missing archive behind a live trigger is usually a write still in
    /// flight, so it is retried like any other infrastructure failure.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Serialization { .. })
    }

    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
