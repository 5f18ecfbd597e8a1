//! Ready-made tenants and domain objects in each workflow status.
//!
//! Objects carry a modification trail consistent with their status, and changes
//! are scheduled a week out so meeting windows are always valid.

use crate::config::{TenantConfig, TenantCredentialsConfig};
use crate::models::{
    ActorId, AnnouncementContent, ChangeContent, DomainObject, MeetingMetadata, ModificationEntry,
    ModificationLog, ModificationType, ObjectContent, TenantContext, TenantRegistry,
};
use crate::state_machine::WorkflowStatus;
use chrono::{Duration, Utc};

pub const AUTHOR: &str = "ops@example.com";
pub const APPROVER: &str = "lead@example.com";

pub fn tenant_config(code: &str) -> TenantConfig {
    TenantConfig {
        code: code.to_string(),
        queue_name: format!("{code}-changes"),
        topic_prefix: code.to_string(),
        recipient_list_id: Some(format!("{code}-recipients")),
        credentials: TenantCredentialsConfig {
            role_reference: Some(format!("role/changeflow-{code}")),
            external_id: None,
        },
    }
}

pub fn tenant(code: &str) -> TenantContext {
    TenantContext::from_config(&tenant_config(code))
}

pub fn registry(codes: &[&str]) -> TenantRegistry {
    let configs: Vec<TenantConfig> = codes.iter().map(|code| tenant_config(code)).collect();
    TenantRegistry::from_config(&configs)
}

fn actor(identity: &str) -> ActorId {
    ActorId::External(identity.to_string())
}

fn trail(steps: &[(&str, ModificationType)]) -> ModificationLog {
    let base = Utc::now() - Duration::hours(steps.len() as i64 + 1);
    let mut log = ModificationLog::new();
    for (offset, (identity, modification_type)) in steps.iter().enumerate() {
        let mut entry = ModificationEntry::new(actor(identity), *modification_type);
        entry.timestamp = base + Duration::hours(offset as i64);
        log.append(entry).expect("fixture entries are well-formed");
    }
    log
}

/// A draft change with only its `created` entry
pub fn draft_change(object_id: &str, tenants: &[&str]) -> DomainObject {
    let start = Utc::now() + Duration::days(7);
    DomainObject {
        object_id: object_id.to_string(),
        title: format!("Maintenance window {object_id}"),
        status: WorkflowStatus::Draft,
        prior_status: None,
        version: 1,
        affected_tenants: tenants.iter().map(|code| code.to_string()).collect(),
        content: ObjectContent::Change(ChangeContent {
            change_reason: "Security patching".to_string(),
            implementation_plan: "Rolling restart".to_string(),
            rollback_plan: "Restore previous image".to_string(),
            customer_impact: "Brief connection resets".to_string(),
            implementation_start: Some(start),
            implementation_end: Some(start + Duration::minutes(90)),
        }),
        meeting_requested: false,
        meeting_metadata: None,
        manual_attendees: Vec::new(),
        survey: None,
        created_by: Some(AUTHOR.to_string()),
        created_at: Some(Utc::now() - Duration::days(1)),
        updated_at: None,
        modifications: trail(&[(AUTHOR, ModificationType::Created)]),
    }
}

pub fn submitted_change(object_id: &str, tenants: &[&str]) -> DomainObject {
    let mut object = draft_change(object_id, tenants);
    object.status = WorkflowStatus::Submitted;
    object.prior_status = Some(WorkflowStatus::Draft);
    object.modifications = trail(&[
        (AUTHOR, ModificationType::Created),
        (AUTHOR, ModificationType::Submitted),
    ]);
    object
}

pub fn approved_change(object_id: &str, tenants: &[&str], meeting_requested: bool) -> DomainObject {
    let mut object = draft_change(object_id, tenants);
    object.status = WorkflowStatus::Approved;
    object.prior_status = Some(WorkflowStatus::Submitted);
    object.meeting_requested = meeting_requested;
    object.modifications = trail(&[
        (AUTHOR, ModificationType::Created),
        (AUTHOR, ModificationType::Submitted),
        (APPROVER, ModificationType::Approved),
    ]);
    object
}

/// Cancelled after approval, or straight out of draft when `was_approved` is false
pub fn cancelled_change(object_id: &str, tenants: &[&str], was_approved: bool) -> DomainObject {
    let mut object = draft_change(object_id, tenants);
    object.status = WorkflowStatus::Cancelled;
    if was_approved {
        object.prior_status = Some(WorkflowStatus::Approved);
        object.modifications = trail(&[
            (AUTHOR, ModificationType::Created),
            (AUTHOR, ModificationType::Submitted),
            (APPROVER, ModificationType::Approved),
            (AUTHOR, ModificationType::Cancelled),
        ]);
    } else {
        object.prior_status = Some(WorkflowStatus::Draft);
        object.modifications = trail(&[
            (AUTHOR, ModificationType::Created),
            (AUTHOR, ModificationType::Cancelled),
        ]);
    }
    object
}

pub fn completed_change(object_id: &str, tenants: &[&str]) -> DomainObject {
    let mut object = draft_change(object_id, tenants);
    object.status = WorkflowStatus::Completed;
    object.prior_status = Some(WorkflowStatus::Approved);
    object.modifications = trail(&[
        (AUTHOR, ModificationType::Created),
        (AUTHOR, ModificationType::Submitted),
        (APPROVER, ModificationType::Approved),
        (AUTHOR, ModificationType::Completed),
    ]);
    object
}

/// An approved announcement with a meeting three days out
pub fn approved_announcement(object_id: &str, tenants: &[&str], meeting_requested: bool) -> DomainObject {
    let mut object = approved_change(object_id, tenants, meeting_requested);
    object.title = format!("Quarterly platform briefing {object_id}");
    object.content = ObjectContent::Announcement(AnnouncementContent {
        announcement_type: "briefing".to_string(),
        summary: "Roadmap and service updates".to_string(),
        content: "Join us for the quarterly briefing.".to_string(),
        meeting_start: Some(Utc::now() + Duration::days(3)),
        meeting_duration_minutes: Some(45),
    });
    object
}

/// A booked meeting two days out
pub fn meeting_metadata(meeting_id: &str) -> MeetingMetadata {
    let start = Utc::now() + Duration::days(2);
    MeetingMetadata {
        meeting_id: meeting_id.to_string(),
        join_url: format!("https://meet.example.com/j/{meeting_id}"),
        start_time: start,
        end_time: start + Duration::hours(1),
        subject: "Change Event: Maintenance window".to_string(),
        organizer: None,
        attendees: None,
    }
}
