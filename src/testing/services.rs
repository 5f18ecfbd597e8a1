//! In-process stand-ins for the outbound services.
//!
//! Each double records what it was asked to do and can be told to fail its next
//! call(s) with a chosen [`ServiceError`].

use crate::config::{MeetingConfig, TimeoutConfig};
use crate::models::{
    ActorId, DomainObject, MeetingMetadata, SurveyReference, SystemActor, TenantContext,
};
use crate::services::{
    FeedbackService, MeetingApi, MeetingRequest, MeetingScheduler, NotificationType, Notifier,
    RecipientDirectory, SendOutcome, ServiceError, ServiceResult,
};
use crate::state_machine::{ActionContext, WorkflowStatus};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Default)]
struct FailureQueue(Mutex<VecDeque<ServiceError>>);

impl FailureQueue {
    fn push(&self, error: ServiceError) {
        self.0.lock().push_back(error);
    }

    fn take(&self) -> ServiceResult<()> {
        match self.0.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Subscriptions keyed by topic name
#[derive(Debug, Clone, Default)]
pub struct StaticRecipientDirectory {
    subscriptions: HashMap<String, Vec<String>>,
}

impl StaticRecipientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscribers(mut self, topic: &str, addresses: &[&str]) -> Self {
        self.subscriptions.insert(
            topic.to_string(),
            addresses.iter().map(|address| address.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl RecipientDirectory for StaticRecipientDirectory {
    async fn subscribers(&self, _tenant: &TenantContext, topic: &str) -> ServiceResult<Vec<String>> {
        Ok(self.subscriptions.get(topic).cloned().unwrap_or_default())
    }
}

/// One recorded `send` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub tenant_code: String,
    pub object_id: String,
    pub notification: NotificationType,
    pub topic: String,
    pub status: WorkflowStatus,
    pub survey_id: Option<String>,
    pub recipients: Vec<String>,
}

pub struct RecordingNotifier {
    recipients: Arc<dyn RecipientDirectory>,
    sent: Mutex<Vec<SentNotification>>,
    failures: FailureQueue,
}

impl RecordingNotifier {
    pub fn new(recipients: Arc<dyn RecipientDirectory>) -> Self {
        Self {
            recipients,
            sent: Mutex::new(Vec::new()),
            failures: FailureQueue::default(),
        }
    }

    pub fn fail_next(&self, error: ServiceError) {
        self.failures.push(error);
    }

    pub fn all_sent(&self) -> Vec<SentNotification> {
        self.sent.lock().clone()
    }

    pub fn sent(&self, tenant_code: &str, object_id: &str) -> Vec<SentNotification> {
        self.sent
            .lock()
            .iter()
            .filter(|record| record.tenant_code == tenant_code && record.object_id == object_id)
            .cloned()
            .collect()
    }

    pub fn sent_types(&self, tenant_code: &str, object_id: &str) -> Vec<NotificationType> {
        self.sent(tenant_code, object_id)
            .into_iter()
            .map(|record| record.notification)
            .collect()
    }

    pub fn sent_count(&self, tenant_code: &str, object_id: &str) -> usize {
        self.sent(tenant_code, object_id).len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        tenant: &TenantContext,
        notification: NotificationType,
        object: &DomainObject,
    ) -> ServiceResult<SendOutcome> {
        self.failures.take()?;
        // Suspend like a network call so concurrent deliveries interleave
        tokio::task::yield_now().await;

        let topic = tenant.topic_for(object.kind(), notification);
        let recipients = self.recipients.subscribers(tenant, &topic).await?;
        let outcome = if recipients.is_empty() {
            SendOutcome::NoRecipients
        } else {
            SendOutcome::Sent {
                sent_count: recipients.len(),
            }
        };

        self.sent.lock().push(SentNotification {
            tenant_code: tenant.tenant_code.clone(),
            object_id: object.object_id.clone(),
            notification,
            topic,
            status: object.status.clone(),
            survey_id: object.survey.as_ref().map(|survey| survey.survey_id.clone()),
            recipients,
        });
        Ok(outcome)
    }
}

#[derive(Debug, Clone)]
struct BookedMeeting {
    tenant_code: String,
    metadata: MeetingMetadata,
    cancelled: bool,
}

/// Calendar keyed by meeting id, searchable by subject within a tenant
#[derive(Debug, Default)]
pub struct InMemoryMeetingApi {
    meetings: Mutex<HashMap<String, BookedMeeting>>,
    created: Mutex<Vec<String>>,
    failures: FailureQueue,
}

impl InMemoryMeetingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, error: ServiceError) {
        self.failures.push(error);
    }

    /// Meetings ever created, including cancelled ones
    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    pub fn active_meetings(&self, tenant_code: &str) -> Vec<MeetingMetadata> {
        self.meetings
            .lock()
            .values()
            .filter(|meeting| meeting.tenant_code == tenant_code && !meeting.cancelled)
            .map(|meeting| meeting.metadata.clone())
            .collect()
    }

    pub fn is_cancelled(&self, meeting_id: &str) -> bool {
        self.meetings
            .lock()
            .get(meeting_id)
            .map(|meeting| meeting.cancelled)
            .unwrap_or(false)
    }
}

#[async_trait]
impl MeetingApi for InMemoryMeetingApi {
    async fn find_by_subject(
        &self,
        tenant: &TenantContext,
        subject: &str,
    ) -> ServiceResult<Option<MeetingMetadata>> {
        self.failures.take()?;
        Ok(self
            .meetings
            .lock()
            .values()
            .find(|meeting| {
                meeting.tenant_code == tenant.tenant_code
                    && !meeting.cancelled
                    && meeting.metadata.subject == subject
            })
            .map(|meeting| meeting.metadata.clone()))
    }

    async fn create_meeting(
        &self,
        tenant: &TenantContext,
        request: &MeetingRequest,
    ) -> ServiceResult<MeetingMetadata> {
        self.failures.take()?;
        let meeting_id = format!("mtg-{}", Uuid::new_v4());
        let metadata = MeetingMetadata {
            meeting_id: meeting_id.clone(),
            join_url: format!("https://meet.example.com/j/{meeting_id}"),
            start_time: request.start_time,
            end_time: request.end_time,
            subject: request.subject.clone(),
            organizer: request.organizer.clone(),
            attendees: Some(request.attendees.clone()),
        };

        self.meetings.lock().insert(
            meeting_id.clone(),
            BookedMeeting {
                tenant_code: tenant.tenant_code.clone(),
                metadata: metadata.clone(),
                cancelled: false,
            },
        );
        self.created.lock().push(meeting_id);
        Ok(metadata)
    }

    async fn cancel_meeting(&self, tenant: &TenantContext, meeting_id: &str) -> ServiceResult<()> {
        self.failures.take()?;
        let mut meetings = self.meetings.lock();
        match meetings.get_mut(meeting_id) {
            Some(meeting) if meeting.tenant_code == tenant.tenant_code && !meeting.cancelled => {
                meeting.cancelled = true;
                Ok(())
            }
            _ => Err(ServiceError::not_found("meetings", meeting_id)),
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingFeedbackService {
    surveys: Mutex<Vec<SurveyReference>>,
    failures: FailureQueue,
}

impl RecordingFeedbackService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, error: ServiceError) {
        self.failures.push(error);
    }

    pub fn created_count(&self) -> usize {
        self.surveys.lock().len()
    }
}

#[async_trait]
impl FeedbackService for RecordingFeedbackService {
    async fn create_survey(
        &self,
        tenant: &TenantContext,
        object: &DomainObject,
    ) -> ServiceResult<SurveyReference> {
        self.failures.take()?;
        let survey_id = format!("survey-{}-{}", tenant.tenant_code, object.object_id);
        let survey = SurveyReference {
            survey_url: format!("https://feedback.example.com/s/{survey_id}"),
            survey_id,
            created_at: Utc::now(),
        };
        self.surveys.lock().push(survey.clone());
        Ok(survey)
    }
}

/// The full set of service doubles, wired together
pub struct TestServices {
    pub notifier: Arc<RecordingNotifier>,
    pub meetings: Arc<InMemoryMeetingApi>,
    pub recipients: Arc<StaticRecipientDirectory>,
    pub feedback: Arc<RecordingFeedbackService>,
}

impl Default for TestServices {
    fn default() -> Self {
        Self::new()
    }
}

impl TestServices {
    pub fn new() -> Self {
        Self::with_recipients(StaticRecipientDirectory::new())
    }

    pub fn with_recipients(recipients: StaticRecipientDirectory) -> Self {
        let recipients = Arc::new(recipients);
        Self {
            notifier: Arc::new(RecordingNotifier::new(recipients.clone())),
            meetings: Arc::new(InMemoryMeetingApi::new()),
            recipients,
            feedback: Arc::new(RecordingFeedbackService::new()),
        }
    }

    pub fn meeting_scheduler(&self) -> MeetingScheduler {
        MeetingScheduler::new(
            self.meetings.clone(),
            self.recipients.clone(),
            &MeetingConfig::default(),
            &TimeoutConfig::default(),
        )
    }

    pub fn action_context(&self, feedback_enabled: bool) -> ActionContext {
        let feedback: Option<Arc<dyn FeedbackService>> = if feedback_enabled {
            Some(self.feedback.clone())
        } else {
            None
        };
        ActionContext {
            notifier: self.notifier.clone(),
            meetings: Arc::new(self.meeting_scheduler()),
            feedback,
            actor: ActorId::system(SystemActor::Reconciler),
            timeouts: TimeoutConfig::default(),
        }
    }
}
