//! # External Service Error Types
//!
//! Errors returned by the collaborators the engine calls out to: the notifier,
//! the recipient directory, the meeting API and the feedback service.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{service} unavailable: {message}")]
    Unavailable { service: String, message: String },

    #[error("{service} throttled the request")]
    Throttled {
        service: String,
        retry_after_ms: Option<u64>,
    },

    #[error("{service} rejected the request: {reason}")]
    Rejected { service: String, reason: String },

    #[error("{service} has no {resource}")]
    NotFound { service: String, resource: String },
}

impl ServiceError {
    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn throttled(service: impl Into<String>, retry_after_ms: Option<u64>) -> Self {
        Self::Throttled {
            service: service.into(),
            retry_after_ms,
        }
    }

    pub fn rejected(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            service: service.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(service: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::NotFound {
            service: service.into(),
            resource: resource.into(),
        }
    }

    /// Unavailability and throttling clear up on their own; rejections do not
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Throttled { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability() {
        assert!(ServiceError::unavailable("notifier", "503").is_retryable());
        assert!(ServiceError::throttled("meetings", Some(2_000)).is_retryable());
        assert!(!ServiceError::rejected("meetings", "bad attendee").is_retryable());
        assert!(!ServiceError::not_found("meetings", "meeting m-1").is_retryable());
    }

    #[test]
    fn test_display() {
        let err = ServiceError::not_found("meetings", "meeting m-1");
        assert_eq!(err.to_string(), "meetings has no meeting m-1");
    }
}
