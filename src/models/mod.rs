pub mod delta;
pub mod domain_object;
pub mod meeting;
pub mod modification;
pub mod modification_log;
pub mod tenant;

// Re-export core models for easy access
pub use delta::{ArchiveDelta, DeltaApplication};
pub use domain_object::{
    AnnouncementContent, ChangeContent, DomainObject, ObjectContent, ObjectKind, SurveyReference,
};
pub use meeting::MeetingMetadata;
pub use modification::{ActorId, ModificationEntry, ModificationType, SystemActor};
pub use modification_log::ModificationLog;
pub use tenant::{TenantContext, TenantCredentials, TenantRegistry};
