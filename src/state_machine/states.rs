use serde::{Deserialize, Serialize};
use std::fmt;

/// Workflow status of a change or announcement.
///
/// The set is closed: any value the engine does not recognize is preserved
/// verbatim in [`WorkflowStatus::Unknown`] so it can be logged and ignored
/// rather than guessed at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WorkflowStatus {
    /// Being edited; never produces a trigger
    Draft,
    /// Awaiting approval
    Submitted,
    /// Approved for implementation or publication
    Approved,
    /// Withdrawn before completion
    Cancelled,
    /// Implemented or published
    Completed,
    /// Any value outside the known lifecycle
    Unknown(String),
}

impl WorkflowStatus {
    /// Statuses with a dispatcher handler
    pub fn has_side_effects(&self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::Approved | Self::Cancelled | Self::Completed
        )
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Unknown(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for WorkflowStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "draft" => Self::Draft,
            "submitted" => Self::Submitted,
            "approved" => Self::Approved,
            "cancelled" => Self::Cancelled,
            "completed" => Self::Completed,
            _ => Self::Unknown(value),
        }
    }
}

impl From<&str> for WorkflowStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<WorkflowStatus> for String {
    fn from(status: WorkflowStatus) -> Self {
        match status {
            WorkflowStatus::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

/// Default status for new objects
impl Default for WorkflowStatus {
    fn default() -> Self {
        Self::Draft
    }
}
