//! # Trigger Reconciler
//!
//! Read-only gate in front of the status handlers. The trigger's existence, not
//! its content or any sequence number, decides whether a tenant still owes work
//! on an object; when it does, the archive is loaded as the only source of truth.

use crate::error::Result;
use crate::storage::{ArchiveRepository, LoadedArchive, TriggerClaim, TriggerStore};
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileDecision {
    /// Trigger already consumed
    Skip,
    Proceed {
        archive: LoadedArchive,
        claim: TriggerClaim,
    },
}

pub struct TriggerReconciler {
    triggers: Arc<TriggerStore>,
    archive: Arc<ArchiveRepository>,
}

impl TriggerReconciler {
    pub fn new(triggers: Arc<TriggerStore>, archive: Arc<ArchiveRepository>) -> Self {
        Self { triggers, archive }
    }

    #[instrument(skip(self))]
    pub async fn reconcile(&self, tenant_code: &str, object_id: &str) -> Result<ReconcileDecision> {
        let Some(claim) = self.triggers.probe(tenant_code, object_id).await? else {
            debug!(tenant_code, object_id, "Trigger already consumed, skipping");
            return Ok(ReconcileDecision::Skip);
        };

        let archive = self.archive.load(object_id).await?;
        Ok(ReconcileDecision::Proceed { archive, claim })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StorageConfig, TimeoutConfig};
    use crate::storage::{InMemoryObjectStore, StorageError, StoreOperation, WriteCondition};
    use crate::testing::fixtures;

    fn reconciler(store: Arc<InMemoryObjectStore>) -> (TriggerReconciler, Arc<TriggerStore>, Arc<ArchiveRepository>) {
        let storage = StorageConfig::default();
        let timeouts = TimeoutConfig::default();
        let triggers = Arc::new(TriggerStore::new(store.clone(), &storage, &timeouts));
        let archive = Arc::new(ArchiveRepository::new(store, &storage, &timeouts, "portal"));
        (
            TriggerReconciler::new(triggers.clone(), archive.clone()),
            triggers,
            archive,
        )
    }

    #[tokio::test]
    async fn test_absent_trigger_skips_without_reading_archive() {
        let store = Arc::new(InMemoryObjectStore::new());
        let (reconciler, _, _) = reconciler(store.clone());
        store.fail_next(
            StoreOperation::Get,
            "archive/",
            StorageError::unavailable("get", "archive/CHG-1.json", "503"),
            1,
        );

        let decision = reconciler.reconcile("acme", "CHG-1").await.unwrap();
        assert_eq!(decision, ReconcileDecision::Skip);
    }

    #[tokio::test]
    async fn test_present_trigger_loads_archive() {
        let store = Arc::new(InMemoryObjectStore::new());
        let (reconciler, triggers, archive) = reconciler(store);
        let object = fixtures::submitted_change("CHG-2", &["acme"]);
        archive.save(&object, WriteCondition::IfNoneMatch).await.unwrap();
        triggers.place("acme", "CHG-2", "portal").await.unwrap();

        match reconciler.reconcile("acme", "CHG-2").await.unwrap() {
            ReconcileDecision::Proceed { archive, claim } => {
                assert_eq!(archive.object, object);
                assert_eq!(claim.tenant_code, "acme");
            }
            other => panic!("expected proceed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_probe_failure_is_retryable() {
        let store = Arc::new(InMemoryObjectStore::new());
        let (reconciler, _, _) = reconciler(store.clone());
        store.fail_next(
            StoreOperation::Head,
            "customers/",
            StorageError::throttled("head", "customers/acme/CHG-3.json"),
            1,
        );

        let err = reconciler.reconcile("acme", "CHG-3").await.unwrap_err();
        assert!(err.is_retryable());
    }
}
