//! # Engine Configuration
//!
//! Typed configuration for the reconciliation engine. Values come from layered
//! sources (TOML files plus `CHANGEFLOW_*` environment variables) assembled by
//! [`ConfigManager`]; every section has working defaults except the engine
//! identity and the tenant list, which a deployment must provide.
//!
//! ```rust,no_run
//! use changeflow_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let config = manager.config();
//! println!("reconciling {} tenants", config.tenants.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::{storage, system_actors};
use crate::models::ActorId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration for the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeflowConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub meeting: MeetingConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

/// Identity of the engine itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Writer identities the engine uses against the object store. Events written
    /// by any of these are discarded by the origin filter.
    #[serde(default)]
    pub identities: Vec<String>,
    /// Actor token recorded on engine-appended modification entries
    #[serde(default = "default_system_actor")]
    pub system_actor: String,
    /// Upper bound on concurrently processed messages per tenant consumer
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_reconciliations: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            identities: Vec::new(),
            system_actor: default_system_actor(),
            max_concurrent_reconciliations: default_max_concurrent(),
        }
    }
}

fn default_system_actor() -> String {
    system_actors::RECONCILER.to_string()
}

fn default_max_concurrent() -> usize {
    4
}

/// Object store layout and write behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub archive_prefix: String,
    pub trigger_prefix: String,
    /// Conditional archive writes attempted before giving up on a conflict storm
    pub max_conditional_write_attempts: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            archive_prefix: storage::DEFAULT_ARCHIVE_PREFIX.to_string(),
            trigger_prefix: storage::DEFAULT_TRIGGER_PREFIX.to_string(),
            max_conditional_write_attempts: 5,
        }
    }
}

/// Per-tenant queue consumption settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub batch_size: usize,
    pub visibility_timeout_seconds: u64,
    pub poll_interval_ms: u64,
    /// Deliveries before the queue moves a message to its dead-letter queue
    pub max_receive_count: u32,
    /// Send validation failures straight to the dead-letter queue instead of
    /// waiting for the redelivery budget to run out
    pub dead_letter_fatal_immediately: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            visibility_timeout_seconds: 300,
            poll_interval_ms: 1000,
            max_receive_count: 5,
            dead_letter_fatal_immediately: false,
        }
    }
}

impl QueueConfig {
    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Bounded timeouts for every external call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub store_ms: u64,
    pub queue_ms: u64,
    pub notifier_ms: u64,
    pub meeting_ms: u64,
    pub feedback_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            store_ms: 5_000,
            queue_ms: 5_000,
            notifier_ms: 15_000,
            meeting_ms: 15_000,
            feedback_ms: 10_000,
        }
    }
}

impl TimeoutConfig {
    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }

    pub fn queue(&self) -> Duration {
        Duration::from_millis(self.queue_ms)
    }

    pub fn notifier(&self) -> Duration {
        Duration::from_millis(self.notifier_ms)
    }

    pub fn meeting(&self) -> Duration {
        Duration::from_millis(self.meeting_ms)
    }

    pub fn feedback(&self) -> Duration {
        Duration::from_millis(self.feedback_ms)
    }
}

/// Backoff configuration for redelivery of transient failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Initial backoff delay in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum backoff delay in milliseconds
    pub max_delay_ms: u64,
    /// Backoff multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 300_000,
            multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingConfig {
    /// Duration used when an object only names a meeting start
    pub default_duration_minutes: i64,
    #[serde(default)]
    pub organizer: Option<String>,
}

impl Default for MeetingConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: 60,
            organizer: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Create a survey artifact before the completion notification
    pub enabled: bool,
}

/// A tenant environment served by the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantConfig {
    pub code: String,
    pub queue_name: String,
    #[serde(default)]
    pub topic_prefix: String,
    #[serde(default)]
    pub recipient_list_id: Option<String>,
    #[serde(default)]
    pub credentials: TenantCredentialsConfig,
}

/// Opaque references used to act inside a tenant environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantCredentialsConfig {
    #[serde(default)]
    pub role_reference: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl ChangeflowConfig {
    /// Validate cross-field invariants that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.engine.identities.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "identities",
                "engine",
            ));
        }
        if let Some(blank) = self.engine.identities.iter().find(|i| i.trim().is_empty()) {
            return Err(ConfigurationError::invalid_value(
                "engine.identities",
                blank.clone(),
                "engine identities must be non-blank",
            ));
        }
        match ActorId::parse(&self.engine.system_actor) {
            Ok(actor) if actor.is_system() => {}
            _ => {
                return Err(ConfigurationError::invalid_value(
                    "engine.system_actor",
                    self.engine.system_actor.clone(),
                    "must be a recognized system actor token",
                ))
            }
        }
        if self.engine.max_concurrent_reconciliations == 0 {
            return Err(ConfigurationError::invalid_value(
                "engine.max_concurrent_reconciliations",
                "0",
                "must be at least 1",
            ));
        }

        if self.storage.archive_prefix.trim_matches('/').is_empty()
            || self.storage.trigger_prefix.trim_matches('/').is_empty()
        {
            return Err(ConfigurationError::invalid_value(
                "storage",
                format!(
                    "{}|{}",
                    self.storage.archive_prefix, self.storage.trigger_prefix
                ),
                "archive and trigger prefixes must be non-empty",
            ));
        }
        if self.storage.archive_prefix.trim_matches('/')
            == self.storage.trigger_prefix.trim_matches('/')
        {
            return Err(ConfigurationError::invalid_value(
                "storage.trigger_prefix",
                self.storage.trigger_prefix.clone(),
                "trigger prefix must differ from archive prefix",
            ));
        }
        if self.storage.max_conditional_write_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "storage.max_conditional_write_attempts",
                "0",
                "must be at least 1",
            ));
        }

        if self.queue.batch_size == 0 || self.queue.max_receive_count == 0 {
            return Err(ConfigurationError::invalid_value(
                "queue",
                format!(
                    "batch_size={} max_receive_count={}",
                    self.queue.batch_size, self.queue.max_receive_count
                ),
                "batch size and max receive count must be at least 1",
            ));
        }

        let timeouts = [
            ("timeouts.store_ms", self.timeouts.store_ms),
            ("timeouts.queue_ms", self.timeouts.queue_ms),
            ("timeouts.notifier_ms", self.timeouts.notifier_ms),
            ("timeouts.meeting_ms", self.timeouts.meeting_ms),
            ("timeouts.feedback_ms", self.timeouts.feedback_ms),
        ];
        if let Some((field, _)) = timeouts.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigurationError::invalid_value(
                *field,
                "0",
                "timeouts must be positive",
            ));
        }

        if self.backoff.initial_delay_ms > self.backoff.max_delay_ms {
            return Err(ConfigurationError::invalid_value(
                "backoff.initial_delay_ms",
                self.backoff.initial_delay_ms.to_string(),
                "initial delay exceeds max delay",
            ));
        }
        if self.backoff.multiplier < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "backoff.multiplier",
                self.backoff.multiplier.to_string(),
                "multiplier must be at least 1.0",
            ));
        }

        if self.meeting.default_duration_minutes <= 0 {
            return Err(ConfigurationError::invalid_value(
                "meeting.default_duration_minutes",
                self.meeting.default_duration_minutes.to_string(),
                "must be positive",
            ));
        }

        let mut seen = HashSet::new();
        for tenant in &self.tenants {
            if tenant.code.trim().is_empty() || tenant.code.contains('/') {
                return Err(ConfigurationError::invalid_value(
                    "tenants.code",
                    tenant.code.clone(),
                    "tenant codes must be non-empty and contain no '/'",
                ));
            }
            if tenant.queue_name.trim().is_empty() {
                return Err(ConfigurationError::missing_required_field(
                    "queue_name",
                    format!("tenant {}", tenant.code),
                ));
            }
            if !seen.insert(tenant.code.as_str()) {
                return Err(ConfigurationError::DuplicateTenant {
                    tenant_code: tenant.code.clone(),
                });
            }
        }

        Ok(())
    }
}
