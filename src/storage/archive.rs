//! # Archive Repository
//!
//! The archive object is the only authoritative copy of a domain object.
//! Updates are optimistic: read with etag, apply the change, write with
//! `IfMatch`, and on a conflict reload and re-apply. No lock is held across
//! the network calls.

use super::errors::StorageError;
use super::keys::KeyLayout;
use super::traits::{ObjectStore, WriteCondition};
use crate::config::{StorageConfig, TimeoutConfig};
use crate::error::{ChangeflowError, Result};
use crate::models::{ArchiveDelta, DeltaApplication, DomainObject};
use crate::resilience::with_timeout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// An archive object together with the etag it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedArchive {
    pub object: DomainObject,
    pub etag: String,
}

/// Outcome of a successful conditional update
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveUpdate {
    pub object: DomainObject,
    pub etag: String,
    pub application: DeltaApplication,
    /// Conditional writes attempted, including the successful one
    pub attempts: u32,
}

pub struct ArchiveRepository {
    store: Arc<dyn ObjectStore>,
    layout: KeyLayout,
    writer_identity: String,
    timeout: Duration,
    max_attempts: u32,
}

impl ArchiveRepository {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        storage: &StorageConfig,
        timeouts: &TimeoutConfig,
        writer_identity: impl Into<String>,
    ) -> Self {
        Self {
            store,
            layout: KeyLayout::from_config(storage),
            writer_identity: writer_identity.into(),
            timeout: timeouts.store(),
            max_attempts: storage.max_conditional_write_attempts.max(1),
        }
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    /// Authoritative read. A missing archive is a retryable `NotFound`.
    #[instrument(skip(self))]
    pub async fn load(&self, object_id: &str) -> Result<LoadedArchive> {
        let key = self.layout.archive_key(object_id);
        let stored = with_timeout("archive.get", self.timeout, self.store.get(&key))
            .await?
            .ok_or_else(|| StorageError::not_found(&key))?;

        let object = DomainObject::from_json_slice(&stored.body, object_id)?;
        debug!(
            object_id = %object_id,
            etag = %stored.metadata.etag,
            status = %object.status,
            "Archive object loaded"
        );
        Ok(LoadedArchive {
            object,
            etag: stored.metadata.etag,
        })
    }

    /// Write a whole object under `condition`, returning the new etag
    pub async fn save(&self, object: &DomainObject, condition: WriteCondition) -> Result<String> {
        object.validate()?;
        let key = self.layout.archive_key(&object.object_id);
        let body = object.to_json_vec()?;
        let metadata = with_timeout(
            "archive.put",
            self.timeout,
            self.store.put(&key, body, condition, &self.writer_identity),
        )
        .await?;
        Ok(metadata.etag)
    }

    /// Apply `delta` with optimistic concurrency.
    ///
    /// `current` is the copy the handler worked from; later attempts reload.
    /// The modification log only ever grows: the delta is appended onto the
    /// freshest copy each time.
    #[instrument(skip(self, delta, current), fields(object_id = %current.object.object_id, tenant_code = %delta.tenant_code))]
    pub async fn apply_delta(
        &self,
        delta: &ArchiveDelta,
        current: LoadedArchive,
    ) -> Result<ArchiveUpdate> {
        let object_id = current.object.object_id.clone();
        let mut current = current;

        for attempt in 1..=self.max_attempts {
            let mut object = current.object.clone();
            let application = delta.apply(&mut object)?;
            if application.is_noop() {
                debug!(attempt, "Tenant already processed this status, nothing to write");
                return Ok(ArchiveUpdate {
                    object,
                    etag: current.etag,
                    application,
                    attempts: attempt,
                });
            }

            match self
                .save(&object, WriteCondition::IfMatch(current.etag.clone()))
                .await
            {
                Ok(etag) => {
                    debug!(
                        attempt,
                        appended = application.appended,
                        superseded = application.superseded,
                        "Archive updated"
                    );
                    return Ok(ArchiveUpdate {
                        object,
                        etag,
                        application,
                        attempts: attempt,
                    });
                }
                Err(ChangeflowError::Storage(err)) if err.is_precondition_failed() => {
                    warn!(attempt, "Archive changed underneath us, reloading");
                    current = self.load(&object_id).await?;
                }
                Err(err) => return Err(err),
            }
        }

        Err(ChangeflowError::ConcurrencyExhausted {
            object_id,
            attempts: self.max_attempts,
        })
    }
}
