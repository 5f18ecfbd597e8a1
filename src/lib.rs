#![allow(clippy::doc_markdown)] // Allow technical terms like RFC3339 in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Changeflow Core
//!
//! Tenant-isolated reconciliation engine for change and announcement
//! notification workflows.
//!
//! ## Overview
//!
//! Portals write a domain object to a shared archive and drop one small trigger
//! per affected tenant. Each trigger write produces a notification on that
//! tenant's queue. The engine consumes those queues independently and, for each
//! event, reconciles the tenant against the archive: it sends the notification
//! for the object's current status, books or cancels meetings, records what it
//! did in the object's append-only modification log, and consumes the trigger.
//!
//! ## Guarantees
//!
//! - **Idempotent replay**: the trigger's existence is the gate; redelivered
//!   events after a successful run are no-ops
//! - **Loop freedom**: events written by the engine's own identity are discarded
//!   before any I/O
//! - **No duplicate meetings**: scheduling searches by a deterministic subject
//!   before creating
//! - **Monotonic audit log**: the log type only exposes append
//! - **Tenant isolation**: one consumer per tenant, nothing mutable shared
//!
//! ## Module Organization
//!
//! - [`models`] - Domain objects, modification log, tenant context
//! - [`state_machine`] - Workflow status, guards, status handlers and dispatcher
//! - [`orchestration`] - Reconciler, processor, tenant consumer, engine bootstrap
//! - [`storage`] - Object store abstraction, archive repository, trigger store
//! - [`messaging`] - Queue abstraction with dead-letter support
//! - [`services`] - Notifier, meeting scheduler, recipient and feedback services
//! - [`events`] - Store notifications, origin filter, notification routing
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use changeflow_core::config::ConfigManager;
//! use changeflow_core::messaging::InMemoryQueueService;
//! use changeflow_core::orchestration::{EngineDependencies, ReconciliationEngine};
//! use changeflow_core::storage::InMemoryObjectStore;
//! use changeflow_core::testing::TestServices;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load()?.config().clone();
//! let services = TestServices::new();
//! let engine = ReconciliationEngine::new(
//!     config,
//!     EngineDependencies {
//!         store: Arc::new(InMemoryObjectStore::new()),
//!         queue: Arc::new(InMemoryQueueService::new(5)),
//!         notifier: services.notifier.clone(),
//!         meetings: services.meetings.clone(),
//!         recipients: services.recipients.clone(),
//!         feedback: Some(services.feedback.clone()),
//!     },
//! )?;
//!
//! let handle = engine.start().await?;
//! handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod orchestration;
pub mod resilience;
pub mod services;
pub mod state_machine;
pub mod storage;
pub mod testing;
pub mod utils;
pub mod validation;

pub use config::{ChangeflowConfig, ConfigManager};
pub use error::{ChangeflowError, ErrorCategory, Result};
pub use models::{DomainObject, ModificationEntry, ModificationLog, TenantContext};
pub use orchestration::{EngineDependencies, EngineHandle, ReconciliationEngine};
pub use state_machine::WorkflowStatus;
pub use validation::ValidationError;
