//! # System Constants
//!
//! Identity tokens, storage layout defaults and log component names shared across
//! the engine.

/// Recognized system-actor tokens for modification log entries
pub mod system_actors {
    pub const PREFIX: &str = "system:";
    pub const RECONCILER: &str = "system:reconciler";
    pub const PORTAL: &str = "system:portal";
    pub const IMPORTER: &str = "system:importer";
    pub const SCHEDULER: &str = "system:scheduler";
}

/// Default object store layout
pub mod storage {
    pub const DEFAULT_ARCHIVE_PREFIX: &str = "archive";
    pub const DEFAULT_TRIGGER_PREFIX: &str = "customers";
    pub const OBJECT_SUFFIX: &str = ".json";
}

/// Component names used in structured log records
pub mod components {
    pub const MEETING_SCHEDULER: &str = "meeting_scheduler";
    pub const TRIGGERS: &str = "trigger_store";
    pub const CONSUMER: &str = "tenant_consumer";
}

/// Top-level fields of the deprecated layout that duplicated the workflow status
pub const LEGACY_STATUS_FIELDS: &[&str] = &["last_action", "request_status"];

/// Keys of the deprecated nested status/request-type map under `metadata`
pub const LEGACY_METADATA_STATUS_KEYS: &[&str] = &["status", "request_type"];

/// Maximum length accepted for an external actor reference
pub const MAX_ACTOR_ID_LENGTH: usize = 256;
