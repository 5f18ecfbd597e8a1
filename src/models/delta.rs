//! Changes a status handler wants persisted on the archive object.
//!
//! Handlers never write the archive themselves. They return an [`ArchiveDelta`]
//! computed against the object they loaded; the archive repository re-applies it
//! to the freshest copy on every conditional-write attempt, so a write conflict
//! never repeats a side effect.

use super::domain_object::{DomainObject, SurveyReference};
use super::meeting::MeetingMetadata;
use super::modification::ModificationEntry;
use crate::state_machine::WorkflowStatus;
use crate::validation::ValidationResult;
use chrono::Utc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDelta {
    pub tenant_code: String,
    /// Side-effect records (meeting scheduled or cancelled)
    pub entries: Vec<ModificationEntry>,
    /// Tenant-scoped completion record, appended last
    pub processed: Option<ModificationEntry>,
    pub meeting_metadata: Option<MeetingMetadata>,
    pub survey: Option<SurveyReference>,
    expected_status: WorkflowStatus,
    expected_status_index: Option<usize>,
}

/// Result of applying a delta to one copy of the object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaApplication {
    pub appended: usize,
    /// A newer status transition landed after the handler ran
    pub superseded: bool,
    /// Another delivery already recorded `processed` for this tenant at the
    /// same status
    pub already_processed: bool,
}

impl DeltaApplication {
    /// Nothing on the object changed, so there is nothing to write
    pub fn is_noop(&self) -> bool {
        self.already_processed && self.appended == 0
    }
}

impl ArchiveDelta {
    /// Start a delta against the object state the handler observed
    pub fn for_object(object: &DomainObject, tenant_code: &str) -> Self {
        Self {
            tenant_code: tenant_code.to_string(),
            entries: Vec::new(),
            processed: None,
            meeting_metadata: None,
            survey: None,
            expected_status: object.status.clone(),
            expected_status_index: object.modifications.latest_status_index(),
        }
    }

    pub fn push_entry(&mut self, entry: ModificationEntry) {
        self.entries.push(entry);
    }

    pub fn set_processed(&mut self, entry: ModificationEntry) {
        self.processed = Some(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
            && self.processed.is_none()
            && self.meeting_metadata.is_none()
            && self.survey.is_none()
    }

    /// Apply to `object` in place.
    ///
    /// Side-effect records and references are kept since the effects already
    /// happened. The `processed` record is dropped when the object moved to a
    /// newer status in the meantime: that status still owes this tenant its own
    /// handler run. When a concurrent delivery already finished this status for
    /// the tenant, only records of effects it did not write are added.
    pub fn apply(&self, object: &mut DomainObject) -> ValidationResult<DeltaApplication> {
        let superseded = object.status != self.expected_status
            || object.modifications.latest_status_index() != self.expected_status_index;
        let already_processed = !superseded
            && object
                .modifications
                .processed_since_latest_status(&self.tenant_code);

        let mut appended = 0;
        for entry in &self.entries {
            if already_processed && object.modifications.has_effect_since_latest_status(entry) {
                continue;
            }
            object.modifications.append(entry.clone())?;
            appended += 1;
        }
        if !superseded && !already_processed {
            if let Some(processed) = &self.processed {
                object.modifications.append(processed.clone())?;
                appended += 1;
            }
        }

        let application = DeltaApplication {
            appended,
            superseded,
            already_processed,
        };
        if application.is_noop() {
            return Ok(application);
        }

        if let Some(metadata) = &self.meeting_metadata {
            object.meeting_metadata = Some(metadata.clone());
        }
        if let Some(survey) = &self.survey {
            object.survey = Some(survey.clone());
        }
        object.updated_at = Some(Utc::now());

        Ok(application)
    }
}
