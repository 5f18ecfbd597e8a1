use crate::validation::{ValidationError, ValidationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifiers and schedule of a meeting booked for a domain object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingMetadata {
    pub meeting_id: String,
    pub join_url: String,
    /// RFC3339 on the wire
    pub start_time: DateTime<Utc>,
    /// RFC3339 on the wire
    pub end_time: DateTime<Utc>,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<String>>,
}

impl MeetingMetadata {
    pub fn validate(&self) -> ValidationResult<()> {
        if self.meeting_id.trim().is_empty() {
            return Err(ValidationError::invalid_meeting("meeting_id is empty"));
        }
        if self.join_url.trim().is_empty() {
            return Err(ValidationError::invalid_meeting(format!(
                "join_url is empty for meeting {}",
                self.meeting_id
            )));
        }
        if self.start_time >= self.end_time {
            return Err(ValidationError::invalid_meeting(format!(
                "meeting {} starts at {} which is not before its end {}",
                self.meeting_id,
                self.start_time.to_rfc3339(),
                self.end_time.to_rfc3339()
            )));
        }
        Ok(())
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}
