//! # Domain Object
//!
//! The archived change or announcement. Both kinds share one shape and differ
//! only in their content block, tagged on the wire by `object_type`.
//!
//! `status` is the single authoritative workflow state. Payloads still carrying
//! the deprecated duplicate status fields are rejected before deserialization
//! (see [`crate::validation::validate_archive_payload`]).

use super::meeting::MeetingMetadata;
use super::modification_log::ModificationLog;
use crate::state_machine::WorkflowStatus;
use crate::validation::{validate_archive_payload, validate_archive_size, ValidationError, ValidationResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Change,
    Announcement,
}

impl ObjectKind {
    /// Human-readable label used in meeting subjects
    pub fn label(&self) -> &'static str {
        match self {
            Self::Change => "Change",
            Self::Announcement => "Announcement",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Change => "change",
            Self::Announcement => "announcement",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields specific to a change request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeContent {
    #[serde(default)]
    pub change_reason: String,
    #[serde(default)]
    pub implementation_plan: String,
    #[serde(default)]
    pub rollback_plan: String,
    #[serde(default)]
    pub customer_impact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation_end: Option<DateTime<Utc>>,
}

/// Fields specific to an announcement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementContent {
    #[serde(default)]
    pub announcement_type: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "object_type", rename_all = "snake_case")]
pub enum ObjectContent {
    Change(ChangeContent),
    Announcement(AnnouncementContent),
}

/// Reference to the feedback survey created when an object completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyReference {
    pub survey_id: String,
    pub survey_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainObject {
    pub object_id: String,
    pub title: String,
    pub status: WorkflowStatus,
    /// Written as `""` for newly created objects
    #[serde(default, with = "crate::utils::serde::empty_string_as_none")]
    pub prior_status: Option<WorkflowStatus>,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub affected_tenants: Vec<String>,
    #[serde(flatten)]
    pub content: ObjectContent,
    #[serde(default)]
    pub meeting_requested: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_metadata: Option<MeetingMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manual_attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub survey: Option<SurveyReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modifications: ModificationLog,
}

impl DomainObject {
    /// Parse an archive payload, rejecting oversized, over-nested or legacy
    /// shaped objects and any object whose id differs from `expected_id`.
    pub fn from_json_slice(bytes: &[u8], expected_id: &str) -> ValidationResult<Self> {
        let value = validate_archive_payload(bytes, expected_id)?;
        let object: DomainObject = serde_json::from_value(value)
            .map_err(|e| ValidationError::malformed(expected_id, e.to_string()))?;

        if object.object_id != expected_id {
            return Err(ValidationError::malformed(
                expected_id,
                format!("archive holds object id '{}'", object.object_id),
            ));
        }
        object.validate()?;
        Ok(object)
    }

    pub fn to_json_vec(&self) -> ValidationResult<Vec<u8>> {
        let bytes = serde_json::to_vec(self)
            .map_err(|e| ValidationError::malformed(&self.object_id, e.to_string()))?;
        validate_archive_size(&bytes)?;
        Ok(bytes)
    }

    pub fn kind(&self) -> ObjectKind {
        match self.content {
            ObjectContent::Change(_) => ObjectKind::Change,
            ObjectContent::Announcement(_) => ObjectKind::Announcement,
        }
    }

    /// Deterministic meeting subject, also the search key for idempotent scheduling
    pub fn meeting_subject(&self) -> String {
        format!("{} Event: {}", self.kind().label(), self.title.trim())
    }

    /// Start and end of the meeting to book for this object
    pub fn meeting_window(
        &self,
        default_duration_minutes: i64,
    ) -> ValidationResult<(DateTime<Utc>, DateTime<Utc>)> {
        let missing = || ValidationError::MissingMeetingWindow {
            object_id: self.object_id.clone(),
        };

        let (start, end) = match &self.content {
            ObjectContent::Change(change) => {
                let start = change.implementation_start.ok_or_else(missing)?;
                let end = change
                    .implementation_end
                    .unwrap_or_else(|| start + Duration::minutes(default_duration_minutes));
                (start, end)
            }
            ObjectContent::Announcement(announcement) => {
                let start = announcement.meeting_start.ok_or_else(missing)?;
                let minutes = announcement
                    .meeting_duration_minutes
                    .map(i64::from)
                    .unwrap_or(default_duration_minutes);
                (start, start + Duration::minutes(minutes))
            }
        };

        if start >= end {
            return Err(missing());
        }
        Ok((start, end))
    }

    pub fn affects_tenant(&self, tenant_code: &str) -> bool {
        self.affected_tenants.iter().any(|code| code == tenant_code)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if self.object_id.trim().is_empty() {
            return Err(ValidationError::malformed("<empty>", "object_id is empty"));
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::malformed(&self.object_id, "title is empty"));
        }

        let mut seen = HashSet::with_capacity(self.affected_tenants.len());
        for code in &self.affected_tenants {
            if code.trim().is_empty() || code.contains('/') {
                return Err(ValidationError::malformed(
                    &self.object_id,
                    format!("invalid tenant code '{code}'"),
                ));
            }
            if !seen.insert(code.as_str()) {
                return Err(ValidationError::malformed(
                    &self.object_id,
                    format!("tenant '{code}' listed twice"),
                ));
            }
        }

        if let Some(metadata) = &self.meeting_metadata {
            metadata.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change_json() -> serde_json::Value {
        json!({
            "object_id": "CHG-1001",
            "object_type": "change",
            "title": "Rotate load balancer certificates",
            "status": "approved",
            "prior_status": "submitted",
            "version": 3,
            "affected_tenants": ["acme", "globex"],
            "change_reason": "Certificates expire next month",
            "implementation_plan": "Rolling replacement",
            "rollback_plan": "Restore previous bundle",
            "customer_impact": "None expected",
            "implementation_start": "2025-06-01T09:00:00Z",
            "implementation_end": "2025-06-01T10:30:00Z",
            "meeting_requested": true,
            "modifications": [
                {"timestamp": "2025-05-20T08:00:00Z", "actor_id": "ops@example.com", "modification_type": "created"},
                {"timestamp": "2025-05-21T08:00:00Z", "actor_id": "ops@example.com", "modification_type": "submitted"},
                {"timestamp": "2025-05-22T08:00:00Z", "actor_id": "lead@example.com", "modification_type": "approved"}
            ]
        })
    }

    #[test]
    fn test_parse_change() {
        let bytes = serde_json::to_vec(&change_json()).unwrap();
        let object = DomainObject::from_json_slice(&bytes, "CHG-1001").unwrap();

        assert_eq!(object.kind(), ObjectKind::Change);
        assert_eq!(object.status, WorkflowStatus::Approved);
        assert_eq!(object.prior_status, Some(WorkflowStatus::Submitted));
        assert_eq!(object.modifications.len(), 3);
        assert!(object.affects_tenant("globex"));
        assert!(!object.affects_tenant("initech"));
        assert_eq!(
            object.meeting_subject(),
            "Change Event: Rotate load balancer certificates"
        );

        let (start, end) = object.meeting_window(60).unwrap();
        assert_eq!((end - start).num_minutes(), 90);
    }

    #[test]
    fn test_empty_prior_status_round_trips_as_empty_string() {
        let mut value = change_json();
        value["prior_status"] = json!("");
        let object: DomainObject = serde_json::from_value(value).unwrap();
        assert_eq!(object.prior_status, None);

        let written = serde_json::to_value(&object).unwrap();
        assert_eq!(written["prior_status"], "");
        assert_eq!(written["object_type"], "change");
    }

    #[test]
    fn test_legacy_status_field_rejected_at_load() {
        let mut value = change_json();
        value["last_action"] = json!("approve");
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            DomainObject::from_json_slice(&bytes, "CHG-1001"),
            Err(ValidationError::LegacyStatusField { .. })
        ));
    }

    #[test]
    fn test_mismatched_object_id_rejected() {
        let bytes = serde_json::to_vec(&change_json()).unwrap();
        assert!(DomainObject::from_json_slice(&bytes, "CHG-9999").is_err());
    }

    #[test]
    fn test_announcement_window_uses_default_duration() {
        let value = json!({
            "object_id": "ANN-7",
            "object_type": "announcement",
            "title": "Quarterly maintenance briefing",
            "status": "approved",
            "announcement_type": "general",
            "summary": "Briefing",
            "content": "Agenda to follow",
            "meeting_start": "2025-07-01T15:00:00Z"
        });
        let object: DomainObject = serde_json::from_value(value).unwrap();
        assert_eq!(object.kind(), ObjectKind::Announcement);
        assert_eq!(
            object.meeting_subject(),
            "Announcement Event: Quarterly maintenance briefing"
        );
        let (start, end) = object.meeting_window(45).unwrap();
        assert_eq!((end - start).num_minutes(), 45);
        assert_eq!(object.prior_status, None);
    }

    #[test]
    fn test_missing_window_is_validation_error() {
        let mut value = change_json();
        value.as_object_mut().unwrap().remove("implementation_start");
        let object: DomainObject = serde_json::from_value(value).unwrap();
        assert!(matches!(
            object.meeting_window(60),
            Err(ValidationError::MissingMeetingWindow { .. })
        ));
    }

    #[test]
    fn test_duplicate_tenant_rejected() {
        let mut value = change_json();
        value["affected_tenants"] = json!(["acme", "acme"]);
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(DomainObject::from_json_slice(&bytes, "CHG-1001").is_err());
    }
}
