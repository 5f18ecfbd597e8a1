//! Outbound notification boundary.
//!
//! Rendering and delivery of the email for a status transition belong to an
//! external system; the engine only needs to know whether anything was sent.

use super::errors::ServiceResult;
use crate::models::{DomainObject, TenantContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    ApprovalRequest,
    Approved,
    Cancelled,
    Completed,
}

impl NotificationType {
    /// Segment used in the tenant's subscription topic names
    pub fn topic_suffix(&self) -> &'static str {
        match self {
            Self::ApprovalRequest => "approval",
            Self::Approved => "approved",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApprovalRequest => "approval_request",
            Self::Approved => "approved",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful outcomes of a send. Having nobody subscribed is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { sent_count: usize },
    NoRecipients,
}

impl SendOutcome {
    pub fn sent_count(&self) -> usize {
        match self {
            Self::Sent { sent_count } => *sent_count,
            Self::NoRecipients => 0,
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        tenant: &TenantContext,
        notification: NotificationType,
        object: &DomainObject,
    ) -> ServiceResult<SendOutcome>;
}
