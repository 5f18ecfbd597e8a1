//! Shared harness for the integration tests.
//!
//! Wires an in-memory object store, queue and service doubles into a
//! [`ReconciliationEngine`] without starting its background tasks. Store
//! notifications are routed to tenant queues explicitly with
//! [`Harness::route_pending`], so every test controls exactly when deliveries
//! happen.

#![allow(dead_code)]

use changeflow_core::config::{BackoffConfig, ChangeflowConfig, EngineConfig, QueueConfig};
use changeflow_core::events::{StorageEvent, TriggerNotificationRouter};
use changeflow_core::messaging::{send_message, InMemoryQueueService, QueueService};
use changeflow_core::models::{DomainObject, ModificationType, TenantRegistry};
use changeflow_core::orchestration::{
    ChangePublisher, EngineDependencies, PollSummary, ReconciliationEngine, TenantConsumer,
};
use changeflow_core::storage::{ArchiveRepository, InMemoryObjectStore, KeyLayout, WriteCondition};
use changeflow_core::testing::{fixtures, StaticRecipientDirectory, TestServices};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};

pub const ENGINE: &str = "role/changeflow-engine";
pub const PORTAL: &str = "role/changeflow-portal";

/// Guards against a routing loop turning into a hanging test
const MAX_DRAIN_ROUNDS: usize = 16;

pub fn config(tenants: &[&str]) -> ChangeflowConfig {
    ChangeflowConfig {
        engine: EngineConfig {
            identities: vec![ENGINE.to_string()],
            ..EngineConfig::default()
        },
        queue: QueueConfig {
            batch_size: 10,
            visibility_timeout_seconds: 30,
            poll_interval_ms: 10,
            max_receive_count: 3,
            dead_letter_fatal_immediately: false,
        },
        // Long enough that a retrying message only comes back through
        // `Harness::redeliver`
        backoff: BackoffConfig {
            initial_delay_ms: 5_000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
        },
        tenants: tenants.iter().map(|code| fixtures::tenant_config(code)).collect(),
        ..ChangeflowConfig::default()
    }
}

/// Subscribers for every notification topic of the given tenants
pub fn recipients(tenants: &[&str]) -> StaticRecipientDirectory {
    let mut directory = StaticRecipientDirectory::new();
    for tenant in tenants {
        for suffix in ["approval", "approved", "cancelled", "completed"] {
            for kind in ["change", "announcement"] {
                directory = directory.with_subscribers(
                    &format!("{tenant}-{kind}-{suffix}"),
                    &[&format!("ops@{tenant}.example.com")],
                );
            }
        }
    }
    directory
}

pub struct Harness {
    pub config: ChangeflowConfig,
    pub store: Arc<InMemoryObjectStore>,
    pub queue: Arc<InMemoryQueueService>,
    pub services: TestServices,
    pub engine: ReconciliationEngine,
    pub publisher: ChangePublisher,
    pub layout: KeyLayout,
    router: TriggerNotificationRouter,
    notifications: broadcast::Receiver<StorageEvent>,
    archive: ArchiveRepository,
}

impl Harness {
    pub async fn new(tenants: &[&str]) -> Self {
        Self::with_config(config(tenants)).await
    }

    pub async fn with_config(config: ChangeflowConfig) -> Self {
        let tenant_codes: Vec<&str> = config.tenants.iter().map(|t| t.code.as_str()).collect();
        let services = TestServices::with_recipients(recipients(&tenant_codes));
        let store = Arc::new(InMemoryObjectStore::new());
        let queue = Arc::new(InMemoryQueueService::new(config.queue.max_receive_count));
        let notifications = store.subscribe();

        for tenant in &config.tenants {
            queue.ensure_queue(&tenant.queue_name).await.unwrap();
        }

        let engine = ReconciliationEngine::new(
            config.clone(),
            EngineDependencies {
                store: store.clone(),
                queue: queue.clone(),
                notifier: services.notifier.clone(),
                meetings: services.meetings.clone(),
                recipients: services.recipients.clone(),
                feedback: Some(services.feedback.clone()),
            },
        )
        .unwrap();

        let layout = KeyLayout::from_config(&config.storage);
        let router = TriggerNotificationRouter::new(
            layout.clone(),
            TenantRegistry::from_config(&config.tenants),
            queue.clone(),
        );
        let publisher = ChangePublisher::new(store.clone(), &config.storage, &config.timeouts, PORTAL);
        let archive = ArchiveRepository::new(store.clone(), &config.storage, &config.timeouts, PORTAL);

        Self {
            config,
            store,
            queue,
            services,
            engine,
            publisher,
            layout,
            router,
            notifications,
            archive,
        }
    }

    pub fn consumer(&self, tenant_code: &str) -> &Arc<TenantConsumer> {
        self.engine
            .consumer(tenant_code)
            .unwrap_or_else(|| panic!("no consumer for tenant {tenant_code}"))
    }

    /// Write `object` to the archive as a portal would and place its triggers
    pub async fn publish(&self, object: &DomainObject) {
        self.archive.save(object, WriteCondition::None).await.unwrap();
        self.publisher.announce(object).await.unwrap();
    }

    /// Overwrite the archive copy without placing triggers
    pub async fn overwrite(&self, object: &DomainObject) {
        self.archive.save(object, WriteCondition::None).await.unwrap();
    }

    /// Deliver every store notification raised so far to its tenant queue.
    /// Returns how many were routed.
    pub async fn route_pending(&mut self) -> usize {
        let mut routed = 0;
        loop {
            match self.notifications.try_recv() {
                Ok(event) => {
                    if self.router.route(&event).await.unwrap() {
                        routed += 1;
                    }
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return routed,
            }
        }
    }

    /// Route and poll until the tenant's queue has nothing visible
    pub async fn drain(&mut self, tenant_code: &str) -> PollSummary {
        let mut total = PollSummary::default();
        for _ in 0..MAX_DRAIN_ROUNDS {
            self.route_pending().await;
            let summary = self.consumer(tenant_code).poll_once().await.unwrap();
            if summary.is_idle() {
                return total;
            }
            total.received += summary.received;
            total.acknowledged += summary.acknowledged;
            total.retrying += summary.retrying;
            total.dead_lettered += summary.dead_lettered;
            total.left_for_redrive += summary.left_for_redrive;
        }
        panic!("queue for {tenant_code} never drained");
    }

    pub async fn drain_all(&mut self) {
        let codes: Vec<String> = self.config.tenants.iter().map(|t| t.code.clone()).collect();
        for code in codes {
            self.drain(&code).await;
        }
    }

    /// Make retrying messages visible again and drain
    pub async fn redeliver(&mut self, tenant_code: &str) -> PollSummary {
        let queue_name = fixtures::tenant_config(tenant_code).queue_name;
        self.queue.expire_visibility(&queue_name);
        self.drain(tenant_code).await
    }

    /// Send an arbitrary event straight to a tenant queue
    pub async fn deliver(&self, tenant_code: &str, event: &StorageEvent) {
        let queue_name = fixtures::tenant_config(tenant_code).queue_name;
        send_message(self.queue.as_ref(), &queue_name, event).await.unwrap();
    }

    pub async fn object(&self, object_id: &str) -> DomainObject {
        self.archive.load(object_id).await.unwrap().object
    }

    pub fn trigger_exists(&self, tenant_code: &str, object_id: &str) -> bool {
        self.store.contains(&self.layout.trigger_key(tenant_code, object_id))
    }

    pub fn trigger_key(&self, tenant_code: &str, object_id: &str) -> String {
        self.layout.trigger_key(tenant_code, object_id)
    }

    pub async fn processed_count(&self, object_id: &str, tenant_code: &str) -> usize {
        self.object(object_id)
            .await
            .modifications
            .count_for_tenant(ModificationType::Processed, tenant_code)
    }
}
