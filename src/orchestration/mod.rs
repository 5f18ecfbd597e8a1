//! # Orchestration
//!
//! The reconciliation pipeline from a tenant queue delivery to a consumed
//! trigger, plus the engine bootstrap that runs one consumer per tenant and the
//! writer-side publisher that produces triggers.

pub mod consumer;
pub mod engine;
pub mod processor;
pub mod reconciler;
pub mod types;
pub mod writer;

pub use consumer::TenantConsumer;
pub use engine::{EngineDependencies, EngineHandle, ReconciliationEngine};
pub use processor::TenantEventProcessor;
pub use reconciler::{ReconcileDecision, TriggerReconciler};
pub use types::{MessageDisposition, PollSummary, ProcessingOutcome};
pub use writer::ChangePublisher;
