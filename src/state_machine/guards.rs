use super::errors::{GuardError, GuardResult};
use super::states::WorkflowStatus;
use crate::models::{DomainObject, ModificationType};

/// Trait for implementing pre-dispatch guards
pub trait StateGuard<T> {
    /// Check whether work on `entity` may proceed
    fn check(&self, entity: &T) -> GuardResult<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Guard that the object actually lists the tenant whose queue delivered it
pub struct TenantAffectedGuard<'a> {
    pub tenant_code: &'a str,
}

impl StateGuard<DomainObject> for TenantAffectedGuard<'_> {
    fn check(&self, object: &DomainObject) -> GuardResult<()> {
        if object.affects_tenant(self.tenant_code) {
            Ok(())
        } else {
            Err(GuardError::TenantNotAffected {
                object_id: object.object_id.clone(),
                tenant_code: self.tenant_code.to_string(),
            })
        }
    }

    fn description(&self) -> &'static str {
        "Object must list the tenant as affected"
    }
}

/// Guard that the tenant has not yet recorded `processed` for the object's
/// current status. Closes the window where a trigger survives a completed run.
///
/// The log only proves the current status was handled when its latest status
/// entry is the one for that status. A status with side effects that was never
/// logged is refused as inconsistent rather than treated as done.
pub struct TenantWorkPendingGuard<'a> {
    pub tenant_code: &'a str,
}

impl StateGuard<DomainObject> for TenantWorkPendingGuard<'_> {
    fn check(&self, object: &DomainObject) -> GuardResult<()> {
        let log = &object.modifications;
        if !log.processed_since_latest_status(self.tenant_code) {
            return Ok(());
        }

        let logged = log.latest_status_type();
        if object.status.has_side_effects() && logged != ModificationType::for_status(&object.status)
        {
            return Err(GuardError::StatusNotLogged {
                object_id: object.object_id.clone(),
                status: object.status.to_string(),
                logged: logged.map_or_else(|| "none".to_string(), |t| t.to_string()),
            });
        }

        Err(GuardError::AlreadyProcessed {
            object_id: object.object_id.clone(),
            tenant_code: self.tenant_code.to_string(),
            status: object.status.to_string(),
        })
    }

    fn description(&self) -> &'static str {
        "Tenant must not have processed the current status yet"
    }
}

/// Business-flow rules applied by writers before they persist a new status.
///
/// The dispatcher never consults this: it reacts to whatever status the archive
/// holds.
pub struct TransitionGuard;

impl TransitionGuard {
    pub fn is_allowed(from: &WorkflowStatus, to: &WorkflowStatus) -> bool {
        use WorkflowStatus::*;
        matches!(
            (from, to),
            (Draft, Submitted)
                | (Submitted, Approved)
                | (Approved, Completed)
                | (Draft, Cancelled)
                | (Submitted, Cancelled)
                | (Approved, Cancelled)
        )
    }

    pub fn check(from: &WorkflowStatus, to: &WorkflowStatus) -> GuardResult<()> {
        if Self::is_allowed(from, to) {
            Ok(())
        } else {
            Err(GuardError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActorId, ModificationEntry, SystemActor};
    use crate::testing::fixtures;

    #[test]
    fn test_transition_rules() {
        use WorkflowStatus::*;
        assert!(TransitionGuard::check(&Draft, &Submitted).is_ok());
        assert!(TransitionGuard::check(&Submitted, &Approved).is_ok());
        assert!(TransitionGuard::check(&Approved, &Completed).is_ok());
        assert!(TransitionGuard::check(&Approved, &Cancelled).is_ok());
        assert!(TransitionGuard::check(&Draft, &Cancelled).is_ok());

        assert!(TransitionGuard::check(&Draft, &Approved).is_err());
        assert!(TransitionGuard::check(&Completed, &Cancelled).is_err());
        assert!(TransitionGuard::check(&Cancelled, &Submitted).is_err());
        assert!(TransitionGuard::check(&Unknown("paused".into()), &Submitted).is_err());
    }

    #[test]
    fn test_work_pending_guard() {
        let mut object = fixtures::submitted_change("CHG-1", &["acme", "globex"]);
        let guard = TenantWorkPendingGuard { tenant_code: "acme" };
        assert!(guard.check(&object).is_ok());

        object
            .modifications
            .append(ModificationEntry::processed(
                ActorId::system(SystemActor::Reconciler),
                "acme",
            ))
            .unwrap();
        assert!(matches!(
            guard.check(&object),
            Err(GuardError::AlreadyProcessed { .. })
        ));
        assert!(TenantWorkPendingGuard { tenant_code: "globex" }
            .check(&object)
            .is_ok());
    }

    #[test]
    fn test_tenant_affected_guard() {
        let object = fixtures::submitted_change("CHG-1", &["acme"]);
        assert!(TenantAffectedGuard { tenant_code: "acme" }.check(&object).is_ok());
        assert!(TenantAffectedGuard { tenant_code: "initech" }
            .check(&object)
            .is_err());
    }

    #[test]
    fn test_unlogged_status_change_is_not_treated_as_processed() {
        let mut object = fixtures::submitted_change("CHG-2", &["acme"]);
        object
            .modifications
            .append(ModificationEntry::processed(
                ActorId::system(SystemActor::Reconciler),
                "acme",
            ))
            .unwrap();
        object.prior_status = Some(WorkflowStatus::Submitted);
        object.status = WorkflowStatus::Approved;

        let guard = TenantWorkPendingGuard { tenant_code: "acme" };
        assert_eq!(
            guard.check(&object),
            Err(GuardError::StatusNotLogged {
                object_id: "CHG-2".to_string(),
                status: "approved".to_string(),
                logged: "submitted".to_string(),
            })
        );

        // Statuses without side effects have nothing to lose, so they still close out
        object.status = WorkflowStatus::from("on_hold");
        assert!(matches!(
            guard.check(&object),
            Err(GuardError::AlreadyProcessed { .. })
        ));
    }
}
