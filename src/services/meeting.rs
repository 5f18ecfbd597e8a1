//! # Meeting Scheduler Adapter
//!
//! Idempotent wrapper around an external calendar API. Scheduling searches for
//! an existing meeting under the object's deterministic subject before creating
//! one, so a redelivered `approved` event reuses the meeting it already booked.
//! Cancelling a meeting the API no longer knows about is treated as done.

use super::errors::ServiceResult;
use super::notifier::NotificationType;
use super::recipients::RecipientDirectory;
use crate::config::{MeetingConfig, TimeoutConfig};
use crate::error::{ChangeflowError, Result};
use crate::logging::log_side_effect;
use crate::models::{DomainObject, MeetingMetadata, ObjectKind, TenantContext};
use crate::resilience::with_timeout;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Everything the calendar API needs to book a meeting for one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetingRequest {
    pub object_id: String,
    pub object_kind: ObjectKind,
    /// Deterministic key: `"{Kind} Event: {title}"`
    pub subject: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub organizer: Option<String>,
    pub attendees: Vec<String>,
}

/// Raw calendar API operations
#[async_trait]
pub trait MeetingApi: Send + Sync {
    async fn find_by_subject(
        &self,
        tenant: &TenantContext,
        subject: &str,
    ) -> ServiceResult<Option<MeetingMetadata>>;

    async fn create_meeting(
        &self,
        tenant: &TenantContext,
        request: &MeetingRequest,
    ) -> ServiceResult<MeetingMetadata>;

    /// Returns `ServiceError::NotFound` for unknown or already cancelled ids
    async fn cancel_meeting(&self, tenant: &TenantContext, meeting_id: &str) -> ServiceResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Created,
    Reused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    AlreadyCancelled,
}

pub struct MeetingScheduler {
    api: Arc<dyn MeetingApi>,
    recipients: Arc<dyn RecipientDirectory>,
    default_duration_minutes: i64,
    organizer: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for MeetingScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeetingScheduler")
            .field("default_duration_minutes", &self.default_duration_minutes)
            .field("organizer", &self.organizer)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MeetingScheduler {
    pub fn new(
        api: Arc<dyn MeetingApi>,
        recipients: Arc<dyn RecipientDirectory>,
        meeting: &MeetingConfig,
        timeouts: &TimeoutConfig,
    ) -> Self {
        Self {
            api,
            recipients,
            default_duration_minutes: meeting.default_duration_minutes,
            organizer: meeting.organizer.clone(),
            timeout: timeouts.meeting(),
        }
    }

    /// Build the request for `object`, resolving attendees from the tenant's
    /// approved-notification subscribers plus the object's manual attendees.
    pub async fn build_request(
        &self,
        tenant: &TenantContext,
        object: &DomainObject,
    ) -> Result<MeetingRequest> {
        let (start_time, end_time) = object.meeting_window(self.default_duration_minutes)?;
        let topic = tenant.topic_for(object.kind(), NotificationType::Approved);
        let subscribed = with_timeout(
            "recipients.subscribers",
            self.timeout,
            self.recipients.subscribers(tenant, &topic),
        )
        .await?;

        Ok(MeetingRequest {
            object_id: object.object_id.clone(),
            object_kind: object.kind(),
            subject: object.meeting_subject(),
            start_time,
            end_time,
            organizer: self.organizer.clone(),
            attendees: merge_attendees(&subscribed, &object.manual_attendees),
        })
    }

    /// Book the meeting, reusing one already filed under the same subject
    #[instrument(skip(self, tenant, request), fields(tenant_code = %tenant.tenant_code, object_id = %request.object_id))]
    pub async fn schedule(
        &self,
        tenant: &TenantContext,
        request: &MeetingRequest,
    ) -> Result<(MeetingMetadata, ScheduleOutcome)> {
        let existing = with_timeout(
            "meetings.find_by_subject",
            self.timeout,
            self.api.find_by_subject(tenant, &request.subject),
        )
        .await?;

        if let Some(metadata) = existing {
            metadata.validate()?;
            info!(
                meeting_id = %metadata.meeting_id,
                subject = %request.subject,
                "Reusing existing meeting for subject"
            );
            return Ok((metadata, ScheduleOutcome::Reused));
        }

        let metadata = with_timeout(
            "meetings.create",
            self.timeout,
            self.api.create_meeting(tenant, request),
        )
        .await?;
        metadata.validate()?;

        log_side_effect(
            "meeting_scheduled",
            &tenant.tenant_code,
            &request.object_id,
            "created",
            Some(&metadata.meeting_id),
        );
        Ok((metadata, ScheduleOutcome::Created))
    }

    /// Cancel a meeting; unknown or already cancelled ids succeed
    #[instrument(skip(self, tenant), fields(tenant_code = %tenant.tenant_code))]
    pub async fn cancel(&self, tenant: &TenantContext, meeting_id: &str) -> Result<CancelOutcome> {
        let result = with_timeout(
            "meetings.cancel",
            self.timeout,
            self.api.cancel_meeting(tenant, meeting_id),
        )
        .await;

        match result {
            Ok(()) => Ok(CancelOutcome::Cancelled),
            Err(ChangeflowError::Service(err)) if err.is_not_found() => {
                debug!(meeting_id = %meeting_id, "Meeting already gone, nothing to cancel");
                Ok(CancelOutcome::AlreadyCancelled)
            }
            Err(err) => Err(err),
        }
    }
}

/// Union of subscribers and manual attendees, de-duplicated case-insensitively.
/// The first spelling seen wins and input order is preserved.
pub fn merge_attendees(subscribed: &[String], manual: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    subscribed
        .iter()
        .chain(manual.iter())
        .map(|address| address.trim())
        .filter(|address| !address.is_empty())
        .filter(|address| seen.insert(address.to_lowercase()))
        .map(str::to_string)
        .collect()
}
