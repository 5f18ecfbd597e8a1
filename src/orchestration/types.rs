//! # Orchestration Types
//!
//! Outcomes reported by the processor for one event and by the consumer for one
//! poll of a tenant queue.

use crate::events::StorageEventKind;
use crate::state_machine::WorkflowStatus;
use crate::storage::ConsumeOutcome;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happened to one trigger notification. Every variant is a success from
/// the queue's point of view and the message is acknowledged.
///
/// `trigger` is `None` when deleting the trigger failed; the next delivery
/// closes it out through the processed-epoch check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingOutcome {
    /// Written by the engine itself
    Discarded,
    /// Removal or other non-creation event
    NotACreation { kind: StorageEventKind },
    /// Trigger already consumed; the work is done
    TriggerAbsent,
    /// A `processed` record for the current status already exists, either
    /// before dispatch or written by a concurrent delivery that finished first
    AlreadyProcessed {
        status: WorkflowStatus,
        trigger: Option<ConsumeOutcome>,
    },
    /// Status without side effects (draft or unrecognized)
    Ignored {
        status: WorkflowStatus,
        trigger: Option<ConsumeOutcome>,
    },
    /// Handler ran and the archive was updated
    Reconciled {
        status: WorkflowStatus,
        appended: usize,
        /// `None` when the trigger was left in place or could not be deleted
        trigger: Option<ConsumeOutcome>,
        superseded: bool,
    },
}

impl ProcessingOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Discarded => "discarded",
            Self::NotACreation { .. } => "not_a_creation",
            Self::TriggerAbsent => "trigger_absent",
            Self::AlreadyProcessed { .. } => "already_processed",
            Self::Ignored { .. } => "ignored",
            Self::Reconciled { .. } => "reconciled",
        }
    }

    /// True when status handlers performed side effects for this event
    pub fn ran_handler(&self) -> bool {
        matches!(self, Self::Reconciled { .. })
    }
}

/// How the consumer settled one delivered message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDisposition {
    Acknowledged,
    /// Transient failure; redelivery pushed out by `delay`
    Retrying { delay: Duration },
    /// Non-retryable failure moved to the dead-letter queue
    DeadLettered,
    /// Non-retryable failure left for the queue's redrive policy
    LeftForRedrive,
}

/// Counters for one poll of a tenant queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSummary {
    pub received: usize,
    pub acknowledged: usize,
    pub retrying: usize,
    pub dead_lettered: usize,
    pub left_for_redrive: usize,
}

impl PollSummary {
    pub fn record(&mut self, disposition: MessageDisposition) {
        match disposition {
            MessageDisposition::Acknowledged => self.acknowledged += 1,
            MessageDisposition::Retrying { .. } => self.retrying += 1,
            MessageDisposition::DeadLettered => self.dead_lettered += 1,
            MessageDisposition::LeftForRedrive => self.left_for_redrive += 1,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.received == 0
    }
}
