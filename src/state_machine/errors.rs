use thiserror::Error;

/// Reasons a guard refuses to let work proceed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("Tenant {tenant_code} already processed {object_id} at status {status}")]
    AlreadyProcessed {
        object_id: String,
        tenant_code: String,
        status: String,
    },

    #[error("{object_id} is {status} but its latest logged transition is {logged}")]
    StatusNotLogged {
        object_id: String,
        status: String,
        logged: String,
    },

    #[error("Tenant {tenant_code} is not affected by {object_id}")]
    TenantNotAffected {
        object_id: String,
        tenant_code: String,
    },

    #[error("Transition {from} -> {to} is not part of the workflow")]
    InvalidTransition { from: String, to: String },
}

pub type GuardResult<T> = Result<T, GuardError>;
