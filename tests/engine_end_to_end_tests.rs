//! The engine running on its own tasks, fed by the notification router.

mod common;

use changeflow_core::events::TriggerNotificationRouter;
use changeflow_core::messaging::InMemoryQueueService;
use changeflow_core::models::{ActorId, ModificationType, TenantRegistry};
use changeflow_core::orchestration::{ChangePublisher, EngineDependencies, ReconciliationEngine};
use changeflow_core::services::NotificationType;
use changeflow_core::state_machine::WorkflowStatus;
use changeflow_core::storage::{InMemoryObjectStore, KeyLayout};
use changeflow_core::testing::{fixtures, TestServices};
use common::PORTAL;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

async fn wait_for(description: &str, mut condition: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {description}");
}

#[tokio::test]
async fn test_background_engine_reconciles_published_changes() {
    let config = common::config(&["acme", "globex"]);
    let services = TestServices::with_recipients(common::recipients(&["acme", "globex"]));
    let store = Arc::new(InMemoryObjectStore::new());
    let queue = Arc::new(InMemoryQueueService::new(config.queue.max_receive_count));
    let notifications = store.subscribe();

    let engine = ReconciliationEngine::new(
        config.clone(),
        EngineDependencies {
            store: store.clone(),
            queue: queue.clone(),
            notifier: services.notifier.clone(),
            meetings: services.meetings.clone(),
            recipients: services.recipients.clone(),
            feedback: None,
        },
    )
    .unwrap();
    let handle = engine.start().await.unwrap();
    assert_eq!(handle.tenant_count(), 2);

    let router = Arc::new(TriggerNotificationRouter::new(
        KeyLayout::from_config(&config.storage),
        TenantRegistry::from_config(&config.tenants),
        queue.clone(),
    ));
    let (stop_router, router_shutdown) = watch::channel(false);
    let router_task = tokio::spawn({
        let router = router.clone();
        async move { router.run(notifications, router_shutdown).await }
    });

    let publisher = ChangePublisher::new(store.clone(), &config.storage, &config.timeouts, PORTAL);
    let mut draft = fixtures::draft_change("CHG-E2E", &["acme", "globex"]);
    draft.meeting_requested = true;
    publisher.create_draft(&draft).await.unwrap();
    publisher
        .transition(
            "CHG-E2E",
            WorkflowStatus::Submitted,
            ActorId::parse(fixtures::AUTHOR).unwrap(),
        )
        .await
        .unwrap();

    let notifier = services.notifier.clone();
    wait_for("approval requests", || {
        notifier.sent_count("acme", "CHG-E2E") == 1 && notifier.sent_count("globex", "CHG-E2E") == 1
    })
    .await;
    wait_for("triggers consumed", || {
        store.keys_with_prefix("customers/").is_empty()
    })
    .await;

    publisher
        .transition(
            "CHG-E2E",
            WorkflowStatus::Approved,
            ActorId::parse(fixtures::APPROVER).unwrap(),
        )
        .await
        .unwrap();
    wait_for("approval notices", || {
        notifier.sent_count("acme", "CHG-E2E") == 2 && notifier.sent_count("globex", "CHG-E2E") == 2
    })
    .await;
    wait_for("triggers consumed", || {
        store.keys_with_prefix("customers/").is_empty()
    })
    .await;

    let object = publisher.load("CHG-E2E").await.unwrap();
    for tenant in ["acme", "globex"] {
        assert_eq!(
            services.notifier.sent_types(tenant, "CHG-E2E"),
            vec![NotificationType::ApprovalRequest, NotificationType::Approved]
        );
        assert_eq!(
            object
                .modifications
                .count_for_tenant(ModificationType::Processed, tenant),
            2
        );
        assert_eq!(services.meetings.active_meetings(tenant).len(), 1);
    }
    assert!(queue.dead_letters("acme-changes").is_empty());
    assert!(queue.dead_letters("globex-changes").is_empty());

    stop_router.send(true).unwrap();
    router_task.await.unwrap();
    handle.shutdown().await;
}
