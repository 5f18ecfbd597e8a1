//! # External Services
//!
//! Narrow interfaces to the collaborators the engine drives: outbound
//! notifications, recipient lists, the calendar API and the feedback survey
//! service. Each call site wraps these in a bounded timeout.

pub mod errors;
pub mod feedback;
pub mod meeting;
pub mod notifier;
pub mod recipients;

pub use errors::{ServiceError, ServiceResult};
pub use feedback::FeedbackService;
pub use meeting::{
    merge_attendees, CancelOutcome, MeetingApi, MeetingRequest, MeetingScheduler, ScheduleOutcome,
};
pub use notifier::{NotificationType, Notifier, SendOutcome};
pub use recipients::RecipientDirectory;
