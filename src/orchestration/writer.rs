//! # Change Publisher
//!
//! The writer side of the workflow, used by portals and importers. It owns the
//! business-flow rules the engine deliberately does not enforce: a status change
//! must pass [`TransitionGuard`], records its own modification entry and prior
//! status, and places one trigger per affected tenant once the archive write has
//! landed. Triggers are written under the publisher's identity so the engine
//! picks them up.

use crate::config::{StorageConfig, TimeoutConfig};
use crate::error::Result;
use crate::models::{ActorId, DomainObject, ModificationEntry, ModificationType};
use crate::state_machine::{GuardError, TransitionGuard, WorkflowStatus};
use crate::storage::{ArchiveRepository, ObjectStore, TriggerStore, WriteCondition};
use crate::validation::ValidationError;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct ChangePublisher {
    archive: ArchiveRepository,
    triggers: TriggerStore,
    writer_identity: String,
}

impl ChangePublisher {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        storage: &StorageConfig,
        timeouts: &TimeoutConfig,
        writer_identity: impl Into<String>,
    ) -> Self {
        let writer_identity = writer_identity.into();
        Self {
            archive: ArchiveRepository::new(store.clone(), storage, timeouts, writer_identity.clone()),
            triggers: TriggerStore::new(store, storage, timeouts),
            writer_identity,
        }
    }

    /// Store a new draft. Drafts have no side effects, so no triggers are placed.
    pub async fn create_draft(&self, object: &DomainObject) -> Result<String> {
        if object.status != WorkflowStatus::Draft {
            return Err(ValidationError::malformed(
                &object.object_id,
                format!("new objects must start as draft, not {}", object.status),
            )
            .into());
        }
        self.archive.save(object, WriteCondition::IfNoneMatch).await
    }

    /// Move an object to `to`, then announce the change to every affected tenant
    #[instrument(skip(self, actor))]
    pub async fn transition(
        &self,
        object_id: &str,
        to: WorkflowStatus,
        actor: ActorId,
    ) -> Result<DomainObject> {
        let loaded = self.archive.load(object_id).await?;
        let mut object = loaded.object;

        TransitionGuard::check(&object.status, &to).map_err(|err| match err {
            GuardError::InvalidTransition { from, to } => ValidationError::InvalidTransition {
                object_id: object_id.to_string(),
                from,
                to,
            },
            other => ValidationError::malformed(object_id, other.to_string()),
        })?;

        let modification_type = ModificationType::for_status(&to).ok_or_else(|| {
            ValidationError::malformed(object_id, format!("no modification type for status {to}"))
        })?;
        object
            .modifications
            .append(ModificationEntry::new(actor, modification_type))?;
        object.prior_status = Some(std::mem::replace(&mut object.status, to));
        object.updated_at = Some(Utc::now());

        self.archive
            .save(&object, WriteCondition::IfMatch(loaded.etag))
            .await?;
        self.announce(&object).await?;

        info!(
            object_id = %object.object_id,
            status = %object.status,
            tenants = object.affected_tenants.len(),
            "Status change published"
        );
        Ok(object)
    }

    /// Place a trigger for every affected tenant, e.g. to re-drive work after an
    /// outage. Stops at the first failure; already placed triggers stay.
    pub async fn announce(&self, object: &DomainObject) -> Result<usize> {
        for tenant_code in &object.affected_tenants {
            self.triggers
                .place(tenant_code, &object.object_id, &self.writer_identity)
                .await
                .map_err(|err| {
                    warn!(
                        object_id = %object.object_id,
                        tenant_code = %tenant_code,
                        error = %err,
                        "Failed to place trigger"
                    );
                    err
                })?;
        }
        Ok(object.affected_tenants.len())
    }

    pub async fn load(&self, object_id: &str) -> Result<DomainObject> {
        Ok(self.archive.load(object_id).await?.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChangeflowError;
    use crate::storage::InMemoryObjectStore;
    use crate::testing::fixtures;

    fn publisher(store: Arc<InMemoryObjectStore>) -> ChangePublisher {
        ChangePublisher::new(
            store,
            &StorageConfig::default(),
            &TimeoutConfig::default(),
            "role/changeflow-portal",
        )
    }

    fn author() -> ActorId {
        ActorId::parse(fixtures::AUTHOR).unwrap()
    }

    #[tokio::test]
    async fn test_draft_places_no_triggers() {
        let store = Arc::new(InMemoryObjectStore::new());
        let publisher = publisher(store.clone());
        publisher
            .create_draft(&fixtures::draft_change("CHG-1", &["acme", "globex"]))
            .await
            .unwrap();
        assert!(store.keys_with_prefix("customers/").is_empty());
    }

    #[tokio::test]
    async fn test_transition_records_prior_status_and_places_triggers() {
        let store = Arc::new(InMemoryObjectStore::new());
        let publisher = publisher(store.clone());
        publisher
            .create_draft(&fixtures::draft_change("CHG-2", &["acme", "globex"]))
            .await
            .unwrap();

        let object = publisher
            .transition("CHG-2", WorkflowStatus::Submitted, author())
            .await
            .unwrap();
        assert_eq!(object.status, WorkflowStatus::Submitted);
        assert_eq!(object.prior_status, Some(WorkflowStatus::Draft));
        assert_eq!(
            object.modifications.last().map(|e| e.modification_type),
            Some(ModificationType::Submitted)
        );
        assert!(store.contains("customers/acme/CHG-2.json"));
        assert!(store.contains("customers/globex/CHG-2.json"));
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected() {
        let store = Arc::new(InMemoryObjectStore::new());
        let publisher = publisher(store.clone());
        publisher
            .create_draft(&fixtures::draft_change("CHG-3", &["acme"]))
            .await
            .unwrap();

        let err = publisher
            .transition("CHG-3", WorkflowStatus::Completed, author())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChangeflowError::Validation(ValidationError::InvalidTransition { .. })
        ));
        assert!(store.keys_with_prefix("customers/").is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_draft_rejected() {
        let store = Arc::new(InMemoryObjectStore::new());
        let publisher = publisher(store);
        let draft = fixtures::draft_change("CHG-4", &["acme"]);
        publisher.create_draft(&draft).await.unwrap();
        let err = publisher.create_draft(&draft).await.unwrap_err();
        assert!(matches!(err, ChangeflowError::Storage(ref e) if e.is_precondition_failed()));
    }
}
