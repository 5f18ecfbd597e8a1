// Workflow status model and the status-driven dispatch of side effects.
//
// The status set is closed with an explicit unknown variant. Guards express the
// writer-side flow rules and the per-tenant "work still owed" checks; actions
// hold the side effects of each status.

pub mod actions;
pub mod dispatcher;
pub mod errors;
pub mod guards;
pub mod states;

// Re-export main types for convenient access
pub use actions::{ActionContext, StatusAction};
pub use dispatcher::{DispatchOutcome, StatusDispatcher};
pub use errors::{GuardError, GuardResult};
pub use guards::{StateGuard, TenantAffectedGuard, TenantWorkPendingGuard, TransitionGuard};
pub use states::WorkflowStatus;
