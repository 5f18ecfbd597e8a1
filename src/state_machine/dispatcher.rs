//! # Status Dispatcher
//!
//! Routes an object to the handler for its *current* status. Prior status is
//! irrelevant here and transition legality is the writer's concern. Statuses
//! without a handler (`draft` and anything unrecognized) are logged and ignored
//! so they never block a tenant's queue.

use super::actions::{
    ActionContext, ApprovedAction, CancelledAction, CompletedAction, StatusAction, SubmittedAction,
};
use super::states::WorkflowStatus;
use crate::error::Result;
use crate::models::{ArchiveDelta, DomainObject, TenantContext};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Handled { delta: ArchiveDelta },
    Ignored { status: WorkflowStatus },
}

pub struct StatusDispatcher {
    ctx: ActionContext,
}

impl StatusDispatcher {
    pub fn new(ctx: ActionContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &ActionContext {
        &self.ctx
    }

    fn handler_for(status: &WorkflowStatus) -> Option<&'static dyn StatusAction> {
        match status {
            WorkflowStatus::Submitted => Some(&SubmittedAction),
            WorkflowStatus::Approved => Some(&ApprovedAction),
            WorkflowStatus::Cancelled => Some(&CancelledAction),
            WorkflowStatus::Completed => Some(&CompletedAction),
            WorkflowStatus::Draft | WorkflowStatus::Unknown(_) => None,
        }
    }

    #[instrument(skip(self, object, tenant), fields(object_id = %object.object_id, tenant_code = %tenant.tenant_code, status = %object.status))]
    pub async fn dispatch(
        &self,
        object: &DomainObject,
        tenant: &TenantContext,
    ) -> Result<DispatchOutcome> {
        let Some(handler) = Self::handler_for(&object.status) else {
            if object.status.is_known() {
                info!(
                    object_id = %object.object_id,
                    tenant_code = %tenant.tenant_code,
                    status = %object.status,
                    "Status has no side effects, ignoring"
                );
            } else {
                warn!(
                    object_id = %object.object_id,
                    tenant_code = %tenant.tenant_code,
                    status = %object.status,
                    "Unsupported status, ignoring"
                );
            }
            return Ok(DispatchOutcome::Ignored {
                status: object.status.clone(),
            });
        };

        info!(
            object_id = %object.object_id,
            tenant_code = %tenant.tenant_code,
            handler = handler.description(),
            "Dispatching status handler"
        );
        let delta = handler.execute(object, tenant, &self.ctx).await?;
        Ok(DispatchOutcome::Handled { delta })
    }
}
