//! Fan-out of store notifications to tenant queues.
//!
//! Plays the role of the bucket's event configuration: every notification for a
//! trigger key is delivered to the queue of the tenant named in the key. Archive
//! writes and foreign keys are not routed.

use super::notification::StorageEvent;
use crate::error::Result;
use crate::messaging::{send_message, QueueService};
use crate::models::TenantRegistry;
use crate::storage::KeyLayout;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

pub struct TriggerNotificationRouter {
    layout: KeyLayout,
    tenants: TenantRegistry,
    queue: Arc<dyn QueueService>,
}

impl TriggerNotificationRouter {
    pub fn new(layout: KeyLayout, tenants: TenantRegistry, queue: Arc<dyn QueueService>) -> Self {
        Self {
            layout,
            tenants,
            queue,
        }
    }

    /// Deliver one notification. Returns whether it was routed to a queue.
    pub async fn route(&self, event: &StorageEvent) -> Result<bool> {
        let Ok(trigger) = self.layout.parse_trigger_key(&event.key) else {
            debug!(key = %event.key, "Not a trigger key, not routed");
            return Ok(false);
        };
        let tenant = match self.tenants.resolve(&trigger.tenant_code) {
            Ok(tenant) => tenant,
            Err(_) => {
                warn!(
                    key = %event.key,
                    tenant_code = %trigger.tenant_code,
                    "Trigger written for an unconfigured tenant, not routed"
                );
                return Ok(false);
            }
        };

        send_message(self.queue.as_ref(), &tenant.queue_name, event).await?;
        Ok(true)
    }

    /// Route notifications until the feed closes or shutdown is signalled
    pub async fn run(
        &self,
        mut events: broadcast::Receiver<StorageEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Notification router shutting down");
                    return;
                }
                received = events.recv() => match received {
                    Ok(event) => {
                        if let Err(err) = self.route(&event).await {
                            warn!(key = %event.key, error = %err, "Failed to route notification");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Notification router lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::{InMemoryQueueService, QueueMessage};
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_routes_trigger_keys_to_tenant_queue() {
        let queue = Arc::new(InMemoryQueueService::new(5));
        queue.ensure_queue("acme-changes").await.unwrap();
        let router = TriggerNotificationRouter::new(
            KeyLayout::default(),
            fixtures::registry(&["acme"]),
            queue.clone(),
        );

        let event = StorageEvent::created("customers/acme/CHG-1.json", Some("ops@example.com".into()));
        assert!(router.route(&event).await.unwrap());
        assert!(!router
            .route(&StorageEvent::created("archive/CHG-1.json", None))
            .await
            .unwrap());
        assert!(!router
            .route(&StorageEvent::created("customers/initech/CHG-1.json", None))
            .await
            .unwrap());

        let delivered = queue
            .receive("acme-changes", 10, std::time::Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(StorageEvent::from_bytes(&delivered[0].payload).unwrap(), event);
    }
}
