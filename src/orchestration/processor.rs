//! # Tenant Event Processor
//!
//! Runs one trigger notification through the reconciliation pipeline:
//!
//! 1. Origin filter (pure, before any I/O)
//! 2. Event kind and trigger key checks against the receiving tenant
//! 3. Trigger existence probe and authoritative archive load
//! 4. Tenant and processed-epoch guards
//! 5. Status dispatch
//! 6. `processed` record and conditional archive update
//! 7. Trigger deletion
//!
//! An archive update failure propagates before the trigger is touched, so the
//! event stays unacknowledged and the trigger stays in place for redelivery.
//! A trigger deletion failure after a successful update is only logged.
//!
//! Deliveries of the same trigger key are serialized within a processor: a
//! duplicate that arrives while the first is still running waits for it and
//! then finds the trigger consumed.

use super::reconciler::{ReconcileDecision, TriggerReconciler};
use super::types::ProcessingOutcome;
use crate::constants::components;
use crate::error::Result;
use crate::events::{EventOriginFilter, StorageEvent};
use crate::logging::{log_error, log_reconcile_operation};
use crate::models::{ModificationEntry, TenantContext};
use crate::state_machine::{
    DispatchOutcome, GuardError, StateGuard, StatusDispatcher, TenantAffectedGuard,
    TenantWorkPendingGuard,
};
use crate::storage::{ArchiveRepository, ConsumeOutcome, KeyLayout, TriggerClaim, TriggerStore};
use crate::validation::ValidationError;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument};

/// Holds the per-key lock for one delivery and drops the map entry once no
/// other delivery of the key is waiting
struct TriggerLease<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TriggerLease<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

pub struct TenantEventProcessor {
    filter: EventOriginFilter,
    layout: KeyLayout,
    reconciler: TriggerReconciler,
    dispatcher: Arc<StatusDispatcher>,
    archive: Arc<ArchiveRepository>,
    triggers: Arc<TriggerStore>,
    writer_identity: String,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl TenantEventProcessor {
    pub fn new(
        filter: EventOriginFilter,
        dispatcher: Arc<StatusDispatcher>,
        archive: Arc<ArchiveRepository>,
        triggers: Arc<TriggerStore>,
        writer_identity: impl Into<String>,
    ) -> Self {
        Self {
            filter,
            layout: triggers.layout().clone(),
            reconciler: TriggerReconciler::new(triggers.clone(), archive.clone()),
            dispatcher,
            archive,
            triggers,
            writer_identity: writer_identity.into(),
            in_flight: DashMap::new(),
        }
    }

    /// Deliveries of `key` currently running or waiting
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    async fn lease(&self, key: &str) -> TriggerLease<'_> {
        let lock = Arc::clone(&self.in_flight.entry(key.to_string()).or_default());
        let guard = lock.lock_owned().await;
        TriggerLease {
            locks: &self.in_flight,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    #[instrument(skip(self, tenant, event), fields(tenant_code = %tenant.tenant_code, key = %event.key))]
    pub async fn process(
        &self,
        tenant: &TenantContext,
        event: &StorageEvent,
    ) -> Result<ProcessingOutcome> {
        if self.filter.is_engine_write(event.writer_identity.as_deref()) {
            debug!(key = %event.key, "Discarding event written by the engine");
            return Ok(ProcessingOutcome::Discarded);
        }
        if !event.is_creation() {
            debug!(key = %event.key, kind = ?event.event_kind, "Not a creation event, nothing to do");
            return Ok(ProcessingOutcome::NotACreation {
                kind: event.event_kind,
            });
        }

        let trigger = self.layout.parse_trigger_key(&event.key)?;
        if trigger.tenant_code != tenant.tenant_code {
            return Err(ValidationError::TenantMismatch {
                expected: tenant.tenant_code.clone(),
                actual: trigger.tenant_code,
            }
            .into());
        }
        let object_id = trigger.object_id.as_str();
        let _lease = self.lease(&event.key).await;

        let (loaded, claim) = match self
            .reconciler
            .reconcile(&tenant.tenant_code, object_id)
            .await?
        {
            ReconcileDecision::Skip => {
                log_reconcile_operation(
                    "reconcile",
                    &tenant.tenant_code,
                    Some(object_id),
                    "skipped",
                    Some("trigger already consumed"),
                );
                return Ok(ProcessingOutcome::TriggerAbsent);
            }
            ReconcileDecision::Proceed { archive, claim } => (archive, claim),
        };
        let object = &loaded.object;

        TenantAffectedGuard {
            tenant_code: &tenant.tenant_code,
        }
        .check(object)
        .map_err(|err| match err {
            GuardError::TenantNotAffected {
                object_id,
                tenant_code,
            } => ValidationError::TenantNotAffected {
                object_id,
                tenant_code,
            },
            other => ValidationError::malformed(object_id, other.to_string()),
        })?;

        match (TenantWorkPendingGuard {
            tenant_code: &tenant.tenant_code,
        })
        .check(object)
        {
            Ok(()) => {}
            Err(err @ GuardError::AlreadyProcessed { .. }) => {
                info!(
                    object_id = %object.object_id,
                    tenant_code = %tenant.tenant_code,
                    reason = %err,
                    "Status already processed for tenant, consuming trigger"
                );
                let trigger = self.consume_trigger(&claim).await;
                return Ok(ProcessingOutcome::AlreadyProcessed {
                    status: object.status.clone(),
                    trigger,
                });
            }
            Err(GuardError::StatusNotLogged {
                object_id,
                status,
                logged,
            }) => {
                return Err(ValidationError::StatusNotLogged {
                    object_id,
                    status,
                    logged,
                }
                .into());
            }
            Err(other) => {
                return Err(ValidationError::malformed(object_id, other.to_string()).into());
            }
        }

        let mut delta = match self.dispatcher.dispatch(object, tenant).await? {
            DispatchOutcome::Ignored { status } => {
                let trigger = self.consume_trigger(&claim).await;
                log_reconcile_operation(
                    "dispatch",
                    &tenant.tenant_code,
                    Some(object_id),
                    "ignored",
                    Some(status.as_str()),
                );
                return Ok(ProcessingOutcome::Ignored { status, trigger });
            }
            DispatchOutcome::Handled { delta } => delta,
        };

        let status = object.status.clone();
        delta.set_processed(ModificationEntry::processed(
            self.dispatcher.context().actor.clone(),
            &tenant.tenant_code,
        ));
        let update = self.archive.apply_delta(&delta, loaded).await?;

        if update.application.already_processed {
            info!(
                object_id = %object_id,
                tenant_code = %tenant.tenant_code,
                appended = update.application.appended,
                "Concurrent delivery finished this status first, consuming trigger"
            );
            let trigger = self.consume_trigger(&claim).await;
            return Ok(ProcessingOutcome::AlreadyProcessed { status, trigger });
        }

        if update.application.superseded {
            info!(
                object_id = %object_id,
                tenant_code = %tenant.tenant_code,
                handled_status = %status,
                current_status = %update.object.status,
                "Status changed while handling, leaving trigger for the newer status"
            );
            return Ok(ProcessingOutcome::Reconciled {
                status,
                appended: update.application.appended,
                trigger: None,
                superseded: true,
            });
        }

        let trigger = self.consume_trigger(&claim).await;
        log_reconcile_operation(
            "reconcile",
            &tenant.tenant_code,
            Some(object_id),
            "completed",
            Some(status.as_str()),
        );
        Ok(ProcessingOutcome::Reconciled {
            status,
            appended: update.application.appended,
            trigger,
            superseded: false,
        })
    }

    /// Delete the claimed trigger. The archive already holds the result, so a
    /// failure here is logged and the event still counts as handled.
    async fn consume_trigger(&self, claim: &TriggerClaim) -> Option<ConsumeOutcome> {
        match self.triggers.consume(claim, &self.writer_identity).await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                log_error(
                    components::TRIGGERS,
                    "consume",
                    &err.to_string(),
                    Some(&claim.tenant_code),
                    Some(&claim.object_id),
                );
                None
            }
        }
    }
}
