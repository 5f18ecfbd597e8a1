//! # Modification Log
//!
//! Append-only audit trail embedded in every archived object. Entries are only
//! ever added through [`ModificationLog::append`], which validates them; there is
//! no mutable access to existing entries. Deserialization runs the same
//! validation so a tampered or malformed trail is rejected at load.

use super::meeting::MeetingMetadata;
use super::modification::{ModificationEntry, ModificationType};
use crate::validation::ValidationResult;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ModificationLog {
    entries: Vec<ModificationEntry>,
}

impl ModificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append one entry
    pub fn append(&mut self, entry: ModificationEntry) -> ValidationResult<()> {
        entry.validate()?;
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[ModificationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&ModificationEntry> {
        self.entries.last()
    }

    /// Metadata of the most recent `meeting_scheduled` entry
    pub fn latest_meeting_metadata(&self) -> Option<&MeetingMetadata> {
        self.entries
            .iter()
            .rev()
            .filter(|entry| entry.modification_type == ModificationType::MeetingScheduled)
            .find_map(|entry| entry.meeting_metadata.as_ref())
    }

    /// Most recent meeting booked on behalf of one tenant
    pub fn latest_meeting_metadata_for_tenant(&self, tenant_code: &str) -> Option<&MeetingMetadata> {
        self.entries
            .iter()
            .rev()
            .filter(|entry| {
                entry.modification_type == ModificationType::MeetingScheduled
                    && entry.tenant_code.as_deref() == Some(tenant_code)
            })
            .find_map(|entry| entry.meeting_metadata.as_ref())
    }

    /// True once any meeting was scheduled, even if it was later cancelled
    pub fn has_meeting_scheduled(&self) -> bool {
        self.has_entry_of_type(ModificationType::MeetingScheduled)
    }

    pub fn has_entry_of_type(&self, modification_type: ModificationType) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.modification_type == modification_type)
    }

    pub fn was_approved(&self) -> bool {
        self.has_entry_of_type(ModificationType::Approved)
    }

    /// Index of the most recent status-transition entry
    pub fn latest_status_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|entry| entry.modification_type.is_status_transition())
    }

    /// Type of the most recent status-transition entry
    pub fn latest_status_type(&self) -> Option<ModificationType> {
        self.latest_status_index()
            .map(|idx| self.entries[idx].modification_type)
    }

    /// Whether an entry recording the same effect as `entry` was already
    /// appended after the most recent status transition
    pub fn has_effect_since_latest_status(&self, entry: &ModificationEntry) -> bool {
        let start = self.latest_status_index().map(|idx| idx + 1).unwrap_or(0);
        self.entries[start..]
            .iter()
            .any(|existing| existing.records_same_effect(entry))
    }

    /// Whether `tenant_code` already has a `processed` entry recorded after the
    /// most recent status transition.
    ///
    /// With no status entry at all, any `processed` entry for the tenant counts.
    pub fn processed_since_latest_status(&self, tenant_code: &str) -> bool {
        let start = self.latest_status_index().map(|idx| idx + 1).unwrap_or(0);
        self.entries[start..].iter().any(|entry| {
            entry.modification_type == ModificationType::Processed
                && entry.tenant_code.as_deref() == Some(tenant_code)
        })
    }

    /// Entries of one type recorded for a tenant
    pub fn count_for_tenant(&self, modification_type: ModificationType, tenant_code: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| {
                entry.modification_type == modification_type
                    && entry.tenant_code.as_deref() == Some(tenant_code)
            })
            .count()
    }
}

impl<'de> Deserialize<'de> for ModificationLog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Vec::<ModificationEntry>::deserialize(deserializer)?;
        let mut log = ModificationLog::with_capacity(raw.len());
        for entry in raw {
            log.append(entry).map_err(serde::de::Error::custom)?;
        }
        Ok(log)
    }
}

impl ModificationLog {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::modification::{ActorId, SystemActor};
    use chrono::{Duration, Utc};

    fn reconciler() -> ActorId {
        ActorId::system(SystemActor::Reconciler)
    }

    fn portal() -> ActorId {
        ActorId::parse("jane.doe@example.com").unwrap()
    }

    fn meeting(id: &str) -> MeetingMetadata {
        let start = Utc::now() + Duration::days(2);
        MeetingMetadata {
            meeting_id: id.to_string(),
            join_url: format!("https://meet.example.com/j/{id}"),
            start_time: start,
            end_time: start + Duration::hours(1),
            subject: "Change Event: Upgrade".to_string(),
            organizer: None,
            attendees: None,
        }
    }

    #[test]
    fn test_append_rejects_invalid_entry() {
        let mut log = ModificationLog::new();
        let mut bad = ModificationEntry::new(reconciler(), ModificationType::MeetingScheduled);
        bad.tenant_code = Some("acme".to_string());
        assert!(log.append(bad).is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn test_latest_meeting_metadata_prefers_most_recent() {
        let mut log = ModificationLog::new();
        log.append(ModificationEntry::new(portal(), ModificationType::Approved))
            .unwrap();
        log.append(ModificationEntry::meeting_scheduled(reconciler(), "acme", meeting("m-1")))
            .unwrap();
        log.append(ModificationEntry::meeting_cancelled(reconciler(), "acme"))
            .unwrap();
        log.append(ModificationEntry::meeting_scheduled(reconciler(), "acme", meeting("m-2")))
            .unwrap();

        assert_eq!(log.latest_meeting_metadata().unwrap().meeting_id, "m-2");
        assert!(log.has_meeting_scheduled());
        assert!(log.was_approved());
    }

    #[test]
    fn test_cancellation_does_not_erase_scheduling() {
        let mut log = ModificationLog::new();
        log.append(ModificationEntry::meeting_scheduled(reconciler(), "acme", meeting("m-1")))
            .unwrap();
        log.append(ModificationEntry::meeting_cancelled(reconciler(), "acme"))
            .unwrap();
        assert!(log.has_meeting_scheduled());
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_processed_since_latest_status() {
        let mut log = ModificationLog::new();
        log.append(ModificationEntry::new(portal(), ModificationType::Submitted))
            .unwrap();
        assert!(!log.processed_since_latest_status("acme"));

        log.append(ModificationEntry::processed(reconciler(), "acme"))
            .unwrap();
        assert!(log.processed_since_latest_status("acme"));
        assert!(!log.processed_since_latest_status("globex"));

        log.append(ModificationEntry::new(portal(), ModificationType::Approved))
            .unwrap();
        assert!(!log.processed_since_latest_status("acme"));
        assert_eq!(log.count_for_tenant(ModificationType::Processed, "acme"), 1);
    }

    #[test]
    fn test_latest_status_type_skips_engine_records() {
        let mut log = ModificationLog::new();
        assert_eq!(log.latest_status_type(), None);
        log.append(ModificationEntry::new(portal(), ModificationType::Approved))
            .unwrap();
        log.append(ModificationEntry::meeting_scheduled(reconciler(), "acme", meeting("m-1")))
            .unwrap();
        log.append(ModificationEntry::processed(reconciler(), "acme"))
            .unwrap();
        assert_eq!(log.latest_status_type(), Some(ModificationType::Approved));
    }

    #[test]
    fn test_effect_lookup_is_scoped_to_current_status() {
        let mut log = ModificationLog::new();
        let scheduled = ModificationEntry::meeting_scheduled(reconciler(), "acme", meeting("m-1"));
        log.append(ModificationEntry::new(portal(), ModificationType::Approved))
            .unwrap();
        log.append(scheduled.clone()).unwrap();

        assert!(log.has_effect_since_latest_status(&ModificationEntry::meeting_scheduled(
            reconciler(),
            "acme",
            meeting("m-1")
        )));
        assert!(!log.has_effect_since_latest_status(&ModificationEntry::meeting_scheduled(
            reconciler(),
            "acme",
            meeting("m-2")
        )));
        assert!(!log.has_effect_since_latest_status(&ModificationEntry::meeting_scheduled(
            reconciler(),
            "globex",
            meeting("m-1")
        )));

        log.append(ModificationEntry::new(portal(), ModificationType::Cancelled))
            .unwrap();
        assert!(!log.has_effect_since_latest_status(&scheduled));
    }

    #[test]
    fn test_deserialize_validates_entries() {
        let json = r#"[
            {"timestamp":"2025-03-01T10:00:00Z","actor_id":"system:portal","modification_type":"submitted"},
            {"timestamp":"2025-03-01T10:05:00Z","actor_id":"system:reconciler","modification_type":"meeting_scheduled","tenant_code":"acme"}
        ]"#;
        assert!(serde_json::from_str::<ModificationLog>(json).is_err());

        let json = r#"[
            {"timestamp":"2025-03-01T10:00:00Z","actor_id":"system:portal","modification_type":"submitted"}
        ]"#;
        let log: ModificationLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(
            serde_json::to_value(&log).unwrap()[0]["modification_type"],
            "submitted"
        );
    }
}
