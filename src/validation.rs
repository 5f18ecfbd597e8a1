//! Boundary validation for archive payloads and trigger inputs.
//!
//! Archive objects are validated before they are deserialized: payload size and
//! nesting are bounded, and any object still carrying a deprecated duplicate
//! status field is rejected outright instead of being normalized.

use crate::constants::{LEGACY_METADATA_STATUS_KEYS, LEGACY_STATUS_FIELDS};
use serde_json::Value;
use thiserror::Error;

/// Maximum allowed size for an archive object payload (1MB)
pub const MAX_ARCHIVE_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum nesting depth for archive JSON
pub const MAX_ARCHIVE_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Object {object_id} carries deprecated status field '{field}'")]
    LegacyStatusField { object_id: String, field: String },

    #[error("Malformed domain object {object_id}: {reason}")]
    MalformedObject { object_id: String, reason: String },

    #[error("Invalid modification entry: {reason}")]
    InvalidModification { reason: String },

    #[error("Invalid meeting metadata: {reason}")]
    InvalidMeetingMetadata { reason: String },

    #[error("Unrecognized actor id: '{actor_id}'")]
    InvalidActorId { actor_id: String },

    #[error("Invalid trigger key {key}: {reason}")]
    InvalidTriggerKey { key: String, reason: String },

    #[error("Trigger for tenant {actual} delivered to queue of tenant {expected}")]
    TenantMismatch { expected: String, actual: String },

    #[error("Tenant {tenant_code} is not affected by object {object_id}")]
    TenantNotAffected {
        object_id: String,
        tenant_code: String,
    },

    #[error("Unknown tenant: {tenant_code}")]
    UnknownTenant { tenant_code: String },

    #[error("Invalid status transition for {object_id}: {from} -> {to}")]
    InvalidTransition {
        object_id: String,
        from: String,
        to: String,
    },

    #[error("Object {object_id} is {status} but its latest logged transition is {logged}")]
    StatusNotLogged {
        object_id: String,
        status: String,
        logged: String,
    },

    #[error("Object {object_id} has no schedulable meeting window")]
    MissingMeetingWindow { object_id: String },

    #[error("Payload too large: {size_bytes} bytes (max: {limit_bytes})")]
    PayloadTooLarge {
        size_bytes: usize,
        limit_bytes: usize,
    },

    #[error("Payload nesting too deep: {depth} (max: {limit})")]
    NestingTooDeep { depth: usize, limit: usize },
}

impl ValidationError {
    pub fn malformed(object_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedObject {
            object_id: object_id.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_modification(reason: impl Into<String>) -> Self {
        Self::InvalidModification {
            reason: reason.into(),
        }
    }

    pub fn invalid_meeting(reason: impl Into<String>) -> Self {
        Self::InvalidMeetingMetadata {
            reason: reason.into(),
        }
    }

    pub fn invalid_trigger_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTriggerKey {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Checks raw archive bytes against the size limit
pub fn validate_archive_size(bytes: &[u8]) -> ValidationResult<()> {
    if bytes.len() > MAX_ARCHIVE_SIZE_BYTES {
        return Err(ValidationError::PayloadTooLarge {
            size_bytes: bytes.len(),
            limit_bytes: MAX_ARCHIVE_SIZE_BYTES,
        });
    }
    Ok(())
}

/// Validates JSON depth recursively
pub fn validate_json_depth(value: &Value, current_depth: usize) -> ValidationResult<()> {
    if current_depth > MAX_ARCHIVE_DEPTH {
        return Err(ValidationError::NestingTooDeep {
            depth: current_depth,
            limit: MAX_ARCHIVE_DEPTH,
        });
    }

    match value {
        Value::Object(map) => {
            for val in map.values() {
                validate_json_depth(val, current_depth + 1)?;
            }
        }
        Value::Array(arr) => {
            for item in arr {
                validate_json_depth(item, current_depth + 1)?;
            }
        }
        _ => {}
    }

    Ok(())
}

/// Rejects objects that still carry the deprecated duplicate status fields.
///
/// The legacy layout stored a top-level "last action" and a nested
/// status/request-type map next to `status`. Either one makes the object
/// ambiguous about its current workflow state.
pub fn reject_legacy_status_fields(value: &Value, object_id: &str) -> ValidationResult<()> {
    let Value::Object(map) = value else {
        return Err(ValidationError::malformed(
            object_id,
            "archive payload must be a JSON object",
        ));
    };

    if let Some(field) = LEGACY_STATUS_FIELDS.iter().find(|f| map.contains_key(**f)) {
        return Err(ValidationError::LegacyStatusField {
            object_id: object_id.to_string(),
            field: (*field).to_string(),
        });
    }

    if let Some(Value::Object(metadata)) = map.get("metadata") {
        if let Some(key) = LEGACY_METADATA_STATUS_KEYS
            .iter()
            .find(|k| metadata.contains_key(**k))
        {
            return Err(ValidationError::LegacyStatusField {
                object_id: object_id.to_string(),
                field: format!("metadata.{key}"),
            });
        }
    }

    Ok(())
}

/// Validates a raw archive payload up to (but not including) typed deserialization
pub fn validate_archive_payload(bytes: &[u8], object_id: &str) -> ValidationResult<Value> {
    validate_archive_size(bytes)?;
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| ValidationError::malformed(object_id, format!("invalid JSON: {e}")))?;
    validate_json_depth(&value, 0)?;
    reject_legacy_status_fields(&value, object_id)?;
    Ok(value)
}
