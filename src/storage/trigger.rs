//! # Trigger Store
//!
//! The ephemeral per-tenant trigger is a consumable claim-check: its presence
//! means work is still owed to that tenant for the object, its absence means the
//! work is done. The engine only ever probes it (metadata only) and deletes it;
//! its body is never read for content.

use super::errors::StorageError;
use super::keys::KeyLayout;
use super::traits::{ObjectMetadata, ObjectStore, WriteCondition};
use crate::config::{StorageConfig, TimeoutConfig};
use crate::error::{ChangeflowError, Result};
use crate::resilience::with_timeout;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Proof that a trigger existed at a specific etag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerClaim {
    pub key: String,
    pub tenant_code: String,
    pub object_id: String,
    pub etag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Deleted,
    /// Someone else already removed it
    AlreadyGone,
    /// A writer replaced it after the claim was taken; the new trigger stays
    Rewritten,
}

#[derive(Serialize)]
struct TriggerBody<'a> {
    tenant_code: &'a str,
    object_id: &'a str,
}

pub struct TriggerStore {
    store: Arc<dyn ObjectStore>,
    layout: KeyLayout,
    timeout: Duration,
}

impl TriggerStore {
    pub fn new(store: Arc<dyn ObjectStore>, storage: &StorageConfig, timeouts: &TimeoutConfig) -> Self {
        Self {
            store,
            layout: KeyLayout::from_config(storage),
            timeout: timeouts.store(),
        }
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Existence probe; `None` means this tenant's work is already done
    pub async fn probe(&self, tenant_code: &str, object_id: &str) -> Result<Option<TriggerClaim>> {
        let key = self.layout.trigger_key(tenant_code, object_id);
        let metadata = with_timeout("trigger.head", self.timeout, self.store.head(&key)).await?;
        Ok(metadata.map(|metadata| TriggerClaim {
            key,
            tenant_code: tenant_code.to_string(),
            object_id: object_id.to_string(),
            etag: metadata.etag,
        }))
    }

    /// Delete the trigger if it is still the one that was claimed
    pub async fn consume(&self, claim: &TriggerClaim, writer: &str) -> Result<ConsumeOutcome> {
        let result = with_timeout(
            "trigger.delete",
            self.timeout,
            self.store.delete(
                &claim.key,
                WriteCondition::IfMatch(claim.etag.clone()),
                writer,
            ),
        )
        .await;

        match result {
            Ok(true) => {
                debug!(key = %claim.key, "Trigger consumed");
                Ok(ConsumeOutcome::Deleted)
            }
            Ok(false) => Ok(ConsumeOutcome::AlreadyGone),
            Err(ChangeflowError::Storage(err)) if err.is_precondition_failed() => {
                info!(
                    key = %claim.key,
                    tenant_code = %claim.tenant_code,
                    object_id = %claim.object_id,
                    "Trigger was rewritten after it was claimed, leaving it in place"
                );
                Ok(ConsumeOutcome::Rewritten)
            }
            Err(err) => Err(err),
        }
    }

    /// Place (or replace) a tenant's trigger. Used by writers.
    pub async fn place(&self, tenant_code: &str, object_id: &str, writer: &str) -> Result<ObjectMetadata> {
        let key = self.layout.trigger_key(tenant_code, object_id);
        let body = serde_json::to_vec(&TriggerBody {
            tenant_code,
            object_id,
        })
        .map_err(|e| StorageError::Serialization {
            key: key.clone(),
            message: e.to_string(),
        })?;
        with_timeout(
            "trigger.put",
            self.timeout,
            self.store.put(&key, body, WriteCondition::None, writer),
        )
        .await
    }
}
