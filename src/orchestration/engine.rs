//! # Reconciliation Engine Bootstrap
//!
//! Wires configuration and providers into one [`TenantConsumer`] per configured
//! tenant and runs each on its own tokio task. Consumers share nothing mutable,
//! so a failing or slow tenant never holds up another; a shared watch channel
//! stops them all.

use super::consumer::TenantConsumer;
use super::processor::TenantEventProcessor;
use crate::config::{ChangeflowConfig, ConfigurationError};
use crate::error::Result;
use crate::events::EventOriginFilter;
use crate::messaging::QueueService;
use crate::models::{ActorId, TenantRegistry};
use crate::resilience::{with_timeout, BackoffPolicy};
use crate::services::{FeedbackService, MeetingApi, MeetingScheduler, Notifier, RecipientDirectory};
use crate::state_machine::{ActionContext, StatusDispatcher};
use crate::storage::{ArchiveRepository, ObjectStore, TriggerStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Providers the engine runs against
#[derive(Clone)]
pub struct EngineDependencies {
    pub store: Arc<dyn ObjectStore>,
    pub queue: Arc<dyn QueueService>,
    pub notifier: Arc<dyn Notifier>,
    pub meetings: Arc<dyn MeetingApi>,
    pub recipients: Arc<dyn RecipientDirectory>,
    /// Only consulted when `feedback.enabled` is set
    pub feedback: Option<Arc<dyn FeedbackService>>,
}

pub struct ReconciliationEngine {
    config: ChangeflowConfig,
    queue: Arc<dyn QueueService>,
    processor: Arc<TenantEventProcessor>,
    consumers: HashMap<String, Arc<TenantConsumer>>,
}

impl ReconciliationEngine {
    pub fn new(config: ChangeflowConfig, deps: EngineDependencies) -> Result<Self> {
        config.validate()?;

        let writer_identity = config
            .engine
            .identities
            .first()
            .cloned()
            .ok_or_else(|| ConfigurationError::missing_required_field("identities", "engine"))?;
        let actor = ActorId::parse(&config.engine.system_actor)?;

        let feedback = if config.feedback.enabled {
            if deps.feedback.is_none() {
                warn!("Feedback surveys enabled but no feedback service configured");
            }
            deps.feedback.clone()
        } else {
            None
        };
        let ctx = ActionContext {
            notifier: deps.notifier.clone(),
            meetings: Arc::new(MeetingScheduler::new(
                deps.meetings.clone(),
                deps.recipients.clone(),
                &config.meeting,
                &config.timeouts,
            )),
            feedback,
            actor,
            timeouts: config.timeouts.clone(),
        };

        let archive = Arc::new(ArchiveRepository::new(
            deps.store.clone(),
            &config.storage,
            &config.timeouts,
            writer_identity.clone(),
        ));
        let triggers = Arc::new(TriggerStore::new(
            deps.store.clone(),
            &config.storage,
            &config.timeouts,
        ));
        let processor = Arc::new(TenantEventProcessor::new(
            EventOriginFilter::new(&config.engine.identities),
            Arc::new(StatusDispatcher::new(ctx)),
            archive,
            triggers,
            writer_identity,
        ));

        let registry = TenantRegistry::from_config(&config.tenants);
        let backoff = BackoffPolicy::from_config(&config.backoff);
        let consumers = registry
            .tenants()
            .map(|tenant| {
                let consumer = TenantConsumer::new(
                    tenant.clone(),
                    processor.clone(),
                    deps.queue.clone(),
                    config.queue.clone(),
                    backoff,
                    config.engine.max_concurrent_reconciliations,
                    &config.timeouts,
                );
                (tenant.tenant_code.clone(), Arc::new(consumer))
            })
            .collect();

        Ok(Self {
            config,
            queue: deps.queue,
            processor,
            consumers,
        })
    }

    pub fn config(&self) -> &ChangeflowConfig {
        &self.config
    }

    pub fn processor(&self) -> &Arc<TenantEventProcessor> {
        &self.processor
    }

    pub fn consumer(&self, tenant_code: &str) -> Option<&Arc<TenantConsumer>> {
        self.consumers.get(tenant_code)
    }

    /// Make sure every tenant queue exists, then start one consumer task per tenant
    pub async fn start(self) -> Result<EngineHandle> {
        for consumer in self.consumers.values() {
            with_timeout(
                "queue.ensure_queue",
                self.config.timeouts.queue(),
                self.queue.ensure_queue(&consumer.tenant().queue_name),
            )
            .await?;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let tasks = self
            .consumers
            .into_iter()
            .map(|(tenant_code, consumer)| {
                let shutdown = shutdown_rx.clone();
                let task = tokio::spawn(async move { consumer.run(shutdown).await });
                (tenant_code, task)
            })
            .collect::<Vec<_>>();

        info!(
            tenants = tasks.len(),
            provider = self.queue.provider_name(),
            "🚀 Reconciliation engine started"
        );
        Ok(EngineHandle {
            shutdown: shutdown_tx,
            tasks,
        })
    }
}

/// Running engine; dropping it without `shutdown` leaves consumers running
pub struct EngineHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl EngineHandle {
    pub fn tenant_count(&self) -> usize {
        self.tasks.len()
    }

    /// Signal every consumer and wait for in-flight batches to settle
    pub async fn shutdown(self) {
        if self.shutdown.send(true).is_err() {
            warn!("All tenant consumers already exited");
        }
        for (tenant_code, task) in self.tasks {
            if let Err(err) = task.await {
                error!(tenant_code = %tenant_code, error = %err, "Tenant consumer task failed");
            }
        }
        info!("🛑 Reconciliation engine stopped");
    }
}
