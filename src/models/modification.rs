//! Typed entries of the modification log.

use super::meeting::MeetingMetadata;
use crate::constants::{system_actors, MAX_ACTOR_ID_LENGTH};
use crate::state_machine::WorkflowStatus;
use crate::validation::{ValidationError, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed set of modification kinds recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationType {
    Created,
    Updated,
    Submitted,
    Approved,
    Cancelled,
    Completed,
    Deleted,
    Processed,
    MeetingScheduled,
    MeetingCancelled,
}

impl ModificationType {
    /// Entries written by a status change, as opposed to edits or engine records
    pub fn is_status_transition(&self) -> bool {
        matches!(
            self,
            Self::Submitted | Self::Approved | Self::Cancelled | Self::Completed
        )
    }

    /// Entry type a writer records when moving an object to `status`
    pub fn for_status(status: &WorkflowStatus) -> Option<Self> {
        match status {
            WorkflowStatus::Submitted => Some(Self::Submitted),
            WorkflowStatus::Approved => Some(Self::Approved),
            WorkflowStatus::Cancelled => Some(Self::Cancelled),
            WorkflowStatus::Completed => Some(Self::Completed),
            WorkflowStatus::Draft | WorkflowStatus::Unknown(_) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Deleted => "deleted",
            Self::Processed => "processed",
            Self::MeetingScheduled => "meeting_scheduled",
            Self::MeetingCancelled => "meeting_cancelled",
        }
    }
}

impl fmt::Display for ModificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModificationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "submitted" => Ok(Self::Submitted),
            "approved" => Ok(Self::Approved),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            "deleted" => Ok(Self::Deleted),
            "processed" => Ok(Self::Processed),
            "meeting_scheduled" => Ok(Self::MeetingScheduled),
            "meeting_cancelled" => Ok(Self::MeetingCancelled),
            _ => Err(ValidationError::invalid_modification(format!(
                "unknown modification type '{s}'"
            ))),
        }
    }
}

/// Built-in actors that write on behalf of the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemActor {
    Reconciler,
    Portal,
    Importer,
    Scheduler,
}

impl SystemActor {
    pub fn token(&self) -> &'static str {
        match self {
            Self::Reconciler => system_actors::RECONCILER,
            Self::Portal => system_actors::PORTAL,
            Self::Importer => system_actors::IMPORTER,
            Self::Scheduler => system_actors::SCHEDULER,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            system_actors::RECONCILER => Some(Self::Reconciler),
            system_actors::PORTAL => Some(Self::Portal),
            system_actors::IMPORTER => Some(Self::Importer),
            system_actors::SCHEDULER => Some(Self::Scheduler),
            _ => None,
        }
    }
}

/// Who performed a modification.
///
/// Either a recognized `system:*` token or an external identity reference: an
/// email-shaped address or a `scheme:identifier` principal (for example a
/// federated role session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActorId {
    System(SystemActor),
    External(String),
}

impl ActorId {
    pub fn parse(raw: &str) -> ValidationResult<Self> {
        let invalid = || ValidationError::InvalidActorId {
            actor_id: raw.to_string(),
        };

        if raw.is_empty() || raw.len() > MAX_ACTOR_ID_LENGTH {
            return Err(invalid());
        }
        if raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid());
        }

        if raw.starts_with(system_actors::PREFIX) {
            return SystemActor::from_token(raw)
                .map(Self::System)
                .ok_or_else(invalid);
        }

        if is_email_shaped(raw) || is_principal_reference(raw) {
            Ok(Self::External(raw.to_string()))
        } else {
            Err(invalid())
        }
    }

    pub fn system(actor: SystemActor) -> Self {
        Self::System(actor)
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::System(actor) => actor.token(),
            Self::External(identity) => identity.as_str(),
        }
    }
}

fn is_email_shaped(raw: &str) -> bool {
    match raw.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

fn is_principal_reference(raw: &str) -> bool {
    match raw.split_once(':') {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
                && !rest.is_empty()
        }
        None => false,
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ActorId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ActorId> for String {
    fn from(actor: ActorId) -> Self {
        match actor {
            ActorId::System(system) => system.token().to_string(),
            ActorId::External(identity) => identity,
        }
    }
}

/// One record of the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationEntry {
    pub timestamp: DateTime<Utc>,
    pub actor_id: ActorId,
    pub modification_type: ModificationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_metadata: Option<MeetingMetadata>,
}

impl ModificationEntry {
    pub fn new(actor_id: ActorId, modification_type: ModificationType) -> Self {
        Self {
            timestamp: Utc::now(),
            actor_id,
            modification_type,
            tenant_code: None,
            meeting_metadata: None,
        }
    }

    pub fn for_tenant(mut self, tenant_code: impl Into<String>) -> Self {
        self.tenant_code = Some(tenant_code.into());
        self
    }

    pub fn processed(actor_id: ActorId, tenant_code: &str) -> Self {
        Self::new(actor_id, ModificationType::Processed).for_tenant(tenant_code)
    }

    pub fn meeting_scheduled(
        actor_id: ActorId,
        tenant_code: &str,
        metadata: MeetingMetadata,
    ) -> Self {
        let mut entry =
            Self::new(actor_id, ModificationType::MeetingScheduled).for_tenant(tenant_code);
        entry.meeting_metadata = Some(metadata);
        entry
    }

    pub fn meeting_cancelled(actor_id: ActorId, tenant_code: &str) -> Self {
        Self::new(actor_id, ModificationType::MeetingCancelled).for_tenant(tenant_code)
    }

    /// Same kind of record for the same tenant and meeting, ignoring who wrote
    /// it and when
    pub fn records_same_effect(&self, other: &ModificationEntry) -> bool {
        self.modification_type == other.modification_type
            && self.tenant_code == other.tenant_code
            && self.meeting_metadata.as_ref().map(|m| m.meeting_id.as_str())
                == other.meeting_metadata.as_ref().map(|m| m.meeting_id.as_str())
    }

    /// Shape checks applied on every append and on load
    pub fn validate(&self) -> ValidationResult<()> {
        if self.timestamp.timestamp() <= 0 {
            return Err(ValidationError::invalid_modification(format!(
                "{} entry has a zero timestamp",
                self.modification_type
            )));
        }

        match (&self.modification_type, &self.meeting_metadata) {
            (ModificationType::MeetingScheduled, Some(metadata)) => metadata.validate()?,
            (ModificationType::MeetingScheduled, None) => {
                return Err(ValidationError::invalid_modification(
                    "meeting_scheduled entry is missing meeting_metadata",
                ))
            }
            (other, Some(_)) => {
                return Err(ValidationError::invalid_modification(format!(
                    "{other} entry must not carry meeting_metadata"
                )))
            }
            (_, None) => {}
        }

        if let Some(tenant) = &self.tenant_code {
            if tenant.trim().is_empty() {
                return Err(ValidationError::invalid_modification(
                    "tenant_code is present but empty",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn meeting() -> MeetingMetadata {
        let start = Utc::now() + Duration::days(1);
        MeetingMetadata {
            meeting_id: "mtg-1".to_string(),
            join_url: "https://meet.example.com/j/1".to_string(),
            start_time: start,
            end_time: start + Duration::hours(1),
            subject: "Change Event: Rotate certificates".to_string(),
            organizer: None,
            attendees: None,
        }
    }

    #[test]
    fn test_actor_id_shapes() {
        assert_eq!(
            ActorId::parse("system:reconciler").unwrap(),
            ActorId::System(SystemActor::Reconciler)
        );
        assert!(ActorId::parse("jane.doe@example.com").is_ok());
        assert!(ActorId::parse("saml:AROAEXAMPLE:jane").is_ok());

        assert!(ActorId::parse("").is_err());
        assert!(ActorId::parse("system:unknown").is_err());
        assert!(ActorId::parse("just-a-name").is_err());
        assert!(ActorId::parse("has space@example.com").is_err());
        assert!(ActorId::parse("@example.com").is_err());
    }

    #[test]
    fn test_meeting_metadata_iff_scheduled() {
        let actor = ActorId::system(SystemActor::Reconciler);

        let scheduled = ModificationEntry::meeting_scheduled(actor.clone(), "acme", meeting());
        assert!(scheduled.validate().is_ok());

        let mut missing = scheduled.clone();
        missing.meeting_metadata = None;
        assert!(missing.validate().is_err());

        let mut stray = ModificationEntry::processed(actor, "acme");
        stray.meeting_metadata = Some(meeting());
        assert!(stray.validate().is_err());
    }

    #[test]
    fn test_zero_timestamp_rejected() {
        let mut entry = ModificationEntry::processed(ActorId::system(SystemActor::Reconciler), "acme");
        entry.timestamp = Utc.timestamp_opt(0, 0).unwrap();
        assert!(entry.validate().is_err());
    }

    #[test]
    fn test_json_shape() {
        let entry = ModificationEntry::processed(ActorId::system(SystemActor::Reconciler), "acme");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["actor_id"], "system:reconciler");
        assert_eq!(value["modification_type"], "processed");
        assert_eq!(value["tenant_code"], "acme");
        assert!(value.get("meeting_metadata").is_none());
    }

    #[test]
    fn test_status_entry_types() {
        assert_eq!(
            ModificationType::for_status(&WorkflowStatus::Approved),
            Some(ModificationType::Approved)
        );
        assert_eq!(
            ModificationType::for_status(&WorkflowStatus::Completed),
            Some(ModificationType::Completed)
        );
        assert_eq!(ModificationType::for_status(&WorkflowStatus::Draft), None);
        assert_eq!(
            ModificationType::for_status(&WorkflowStatus::from("on_hold")),
            None
        );
    }

    #[test]
    fn test_same_effect_ignores_actor_and_time() {
        let scheduled = ModificationEntry::meeting_scheduled(
            ActorId::system(SystemActor::Reconciler),
            "acme",
            meeting(),
        );
        let mut replayed = scheduled.clone();
        replayed.timestamp = scheduled.timestamp + Duration::seconds(5);
        replayed.actor_id = ActorId::parse("ops@example.com").unwrap();
        assert!(scheduled.records_same_effect(&replayed));

        let mut other_meeting = scheduled.clone();
        if let Some(metadata) = other_meeting.meeting_metadata.as_mut() {
            metadata.meeting_id = "mtg-2".to_string();
        }
        assert!(!scheduled.records_same_effect(&other_meeting));

        let processed = ModificationEntry::processed(ActorId::system(SystemActor::Reconciler), "acme");
        assert!(!scheduled.records_same_effect(&processed));
        assert!(!processed.records_same_effect(&ModificationEntry::processed(
            ActorId::system(SystemActor::Reconciler),
            "globex"
        )));
    }

    #[test]
    fn test_unknown_type_rejected_on_parse() {
        assert!("renamed".parse::<ModificationType>().is_err());
        let json = r#"{"timestamp":"2025-01-01T00:00:00Z","actor_id":"system:portal","modification_type":"renamed"}"#;
        assert!(serde_json::from_str::<ModificationEntry>(json).is_err());
    }
}
