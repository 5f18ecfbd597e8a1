//! Per-status side effects.
//!
//! Each action performs the outbound calls for one status and describes what
//! should be recorded as an [`ArchiveDelta`]. Actions never touch the archive;
//! the processor appends the tenant's `processed` entry and persists the delta.

use crate::config::TimeoutConfig;
use crate::error::Result;
use crate::logging::{log_error, log_side_effect};
use crate::models::{ActorId, ArchiveDelta, DomainObject, ModificationEntry, TenantContext};
use crate::resilience::with_timeout;
use crate::services::{
    FeedbackService, MeetingScheduler, NotificationType, Notifier, SendOutcome,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Collaborators and settings shared by every action
pub struct ActionContext {
    pub notifier: Arc<dyn Notifier>,
    pub meetings: Arc<MeetingScheduler>,
    /// `None` when feedback surveys are disabled
    pub feedback: Option<Arc<dyn FeedbackService>>,
    /// Actor recorded on engine-appended entries
    pub actor: ActorId,
    pub timeouts: TimeoutConfig,
}

impl ActionContext {
    async fn notify(
        &self,
        tenant: &TenantContext,
        notification: NotificationType,
        object: &DomainObject,
    ) -> Result<SendOutcome> {
        let outcome = with_timeout(
            "notifier.send",
            self.timeouts.notifier(),
            self.notifier.send(tenant, notification, object),
        )
        .await?;

        let details = match outcome {
            SendOutcome::Sent { sent_count } => format!("sent to {sent_count} recipients"),
            SendOutcome::NoRecipients => "no recipients subscribed".to_string(),
        };
        log_side_effect(
            notification.as_str(),
            &tenant.tenant_code,
            &object.object_id,
            "ok",
            Some(&details),
        );
        Ok(outcome)
    }
}

/// Trait for implementing status handlers
#[async_trait]
pub trait StatusAction: Send + Sync {
    /// Perform the side effects for `object` on behalf of `tenant`
    async fn execute(
        &self,
        object: &DomainObject,
        tenant: &TenantContext,
        ctx: &ActionContext,
    ) -> Result<ArchiveDelta>;

    /// Get a description of this action for logging
    fn description(&self) -> &'static str;
}

/// `submitted`: ask approvers to review
pub struct SubmittedAction;

#[async_trait]
impl StatusAction for SubmittedAction {
    async fn execute(
        &self,
        object: &DomainObject,
        tenant: &TenantContext,
        ctx: &ActionContext,
    ) -> Result<ArchiveDelta> {
        ctx.notify(tenant, NotificationType::ApprovalRequest, object)
            .await?;
        Ok(ArchiveDelta::for_object(object, &tenant.tenant_code))
    }

    fn description(&self) -> &'static str {
        "Send approval request"
    }
}

/// `approved`: book the meeting if one was requested, then announce approval.
///
/// A failed booking is logged and skipped; the approval email still goes out
/// and the object is saved without meeting metadata.
pub struct ApprovedAction;

impl ApprovedAction {
    async fn book_meeting(
        &self,
        object: &DomainObject,
        tenant: &TenantContext,
        ctx: &ActionContext,
        delta: &mut ArchiveDelta,
    ) -> Result<()> {
        let request = ctx.meetings.build_request(tenant, object).await?;
        let (metadata, outcome) = ctx.meetings.schedule(tenant, &request).await?;
        debug!(
            object_id = %object.object_id,
            meeting_id = %metadata.meeting_id,
            outcome = ?outcome,
            "Meeting booked"
        );
        delta.push_entry(ModificationEntry::meeting_scheduled(
            ctx.actor.clone(),
            &tenant.tenant_code,
            metadata.clone(),
        ));
        delta.meeting_metadata = Some(metadata);
        Ok(())
    }
}

#[async_trait]
impl StatusAction for ApprovedAction {
    async fn execute(
        &self,
        object: &DomainObject,
        tenant: &TenantContext,
        ctx: &ActionContext,
    ) -> Result<ArchiveDelta> {
        let mut delta = ArchiveDelta::for_object(object, &tenant.tenant_code);

        if object.meeting_requested {
            if let Err(err) = self.book_meeting(object, tenant, ctx, &mut delta).await {
                log_error(
                    crate::constants::components::MEETING_SCHEDULER,
                    "schedule",
                    &err.to_string(),
                    Some(&tenant.tenant_code),
                    Some(&object.object_id),
                );
            }
        }

        ctx.notify(tenant, NotificationType::Approved, object).await?;
        Ok(delta)
    }

    fn description(&self) -> &'static str {
        "Schedule requested meeting and announce approval"
    }
}

/// `cancelled`: cancel any booked meeting and retract a public announcement
pub struct CancelledAction;

#[async_trait]
impl StatusAction for CancelledAction {
    async fn execute(
        &self,
        object: &DomainObject,
        tenant: &TenantContext,
        ctx: &ActionContext,
    ) -> Result<ArchiveDelta> {
        let mut delta = ArchiveDelta::for_object(object, &tenant.tenant_code);
        let log = &object.modifications;

        let meeting = log
            .latest_meeting_metadata_for_tenant(&tenant.tenant_code)
            .or(object.meeting_metadata.as_ref());

        if let Some(metadata) = meeting {
            let outcome = ctx.meetings.cancel(tenant, &metadata.meeting_id).await?;
            info!(
                object_id = %object.object_id,
                tenant_code = %tenant.tenant_code,
                meeting_id = %metadata.meeting_id,
                outcome = ?outcome,
                "Meeting cancellation handled"
            );
        }

        if object.meeting_requested || meeting.is_some() || log.has_meeting_scheduled() {
            delta.push_entry(ModificationEntry::meeting_cancelled(
                ctx.actor.clone(),
                &tenant.tenant_code,
            ));
        }

        if log.was_approved() {
            ctx.notify(tenant, NotificationType::Cancelled, object)
                .await?;
        } else {
            debug!(
                object_id = %object.object_id,
                tenant_code = %tenant.tenant_code,
                "Object was never approved, skipping cancellation notice"
            );
        }

        Ok(delta)
    }

    fn description(&self) -> &'static str {
        "Cancel meeting and retract approval announcement"
    }
}

/// `completed`: attach a feedback survey when enabled, then announce completion.
/// A survey failure never blocks the completion email.
pub struct CompletedAction;

#[async_trait]
impl StatusAction for CompletedAction {
    async fn execute(
        &self,
        object: &DomainObject,
        tenant: &TenantContext,
        ctx: &ActionContext,
    ) -> Result<ArchiveDelta> {
        let mut delta = ArchiveDelta::for_object(object, &tenant.tenant_code);

        let survey = match (&ctx.feedback, &object.survey) {
            (Some(feedback), None) => {
                match with_timeout(
                    "feedback.create_survey",
                    ctx.timeouts.feedback(),
                    feedback.create_survey(tenant, object),
                )
                .await
                {
                    Ok(survey) => {
                        log_side_effect(
                            "survey_created",
                            &tenant.tenant_code,
                            &object.object_id,
                            "ok",
                            Some(&survey.survey_id),
                        );
                        Some(survey)
                    }
                    Err(err) => {
                        log_error(
                            "feedback",
                            "create_survey",
                            &err.to_string(),
                            Some(&tenant.tenant_code),
                            Some(&object.object_id),
                        );
                        None
                    }
                }
            }
            _ => None,
        };

        match survey {
            Some(survey) => {
                let mut with_survey = object.clone();
                with_survey.survey = Some(survey.clone());
                delta.survey = Some(survey);
                ctx.notify(tenant, NotificationType::Completed, &with_survey)
                    .await?;
            }
            None => {
                ctx.notify(tenant, NotificationType::Completed, object)
                    .await?;
            }
        }

        Ok(delta)
    }

    fn description(&self) -> &'static str {
        "Attach feedback survey and announce completion"
    }
}
