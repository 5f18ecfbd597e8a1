//! Object store key layout.
//!
//! - archive: `{archive_prefix}/{object_id}.json`
//! - trigger: `{trigger_prefix}/{tenant_code}/{object_id}.json`

use crate::config::StorageConfig;
use crate::constants::storage::OBJECT_SUFFIX;
use crate::validation::{ValidationError, ValidationResult};

/// Tenant and object named by a trigger key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriggerRef {
    pub tenant_code: String,
    pub object_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    archive_prefix: String,
    trigger_prefix: String,
}

impl KeyLayout {
    pub fn new(archive_prefix: &str, trigger_prefix: &str) -> Self {
        Self {
            archive_prefix: archive_prefix.trim_matches('/').to_string(),
            trigger_prefix: trigger_prefix.trim_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.archive_prefix, &config.trigger_prefix)
    }

    pub fn archive_key(&self, object_id: &str) -> String {
        format!("{}/{object_id}{OBJECT_SUFFIX}", self.archive_prefix)
    }

    pub fn trigger_key(&self, tenant_code: &str, object_id: &str) -> String {
        format!("{}/{tenant_code}/{object_id}{OBJECT_SUFFIX}", self.trigger_prefix)
    }

    pub fn is_trigger_key(&self, key: &str) -> bool {
        self.parse_trigger_key(key).is_ok()
    }

    pub fn parse_trigger_key(&self, key: &str) -> ValidationResult<TriggerRef> {
        let invalid = |reason: &str| ValidationError::invalid_trigger_key(key, reason);

        let rest = key
            .strip_prefix(self.trigger_prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| invalid("outside the trigger prefix"))?;

        let (tenant_code, file) = rest
            .split_once('/')
            .ok_or_else(|| invalid("missing tenant segment"))?;
        let object_id = file
            .strip_suffix(OBJECT_SUFFIX)
            .ok_or_else(|| invalid("missing object suffix"))?;

        if tenant_code.is_empty() {
            return Err(invalid("empty tenant code"));
        }
        if object_id.is_empty() || object_id.contains('/') {
            return Err(invalid("object id must be a single non-empty segment"));
        }

        Ok(TriggerRef {
            tenant_code: tenant_code.to_string(),
            object_id: object_id.to_string(),
        })
    }
}

impl Default for KeyLayout {
    fn default() -> Self {
        Self::from_config(&StorageConfig::default())
    }
}
