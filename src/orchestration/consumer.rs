//! # Tenant Consumer
//!
//! Polls one tenant's queue and settles every delivery:
//!
//! - success (including every expected no-op): acknowledge
//! - transient failure: keep unacknowledged and push redelivery out with
//!   exponential backoff keyed on the receive count
//! - validation or other non-retryable failure: leave for the queue's redrive
//!   policy, or dead-letter immediately when configured to
//!
//! Messages within a batch are processed concurrently up to a bounded limit.
//! Nothing here is shared with other tenants' consumers.

use super::processor::TenantEventProcessor;
use super::types::{MessageDisposition, PollSummary};
use crate::config::{QueueConfig, TimeoutConfig};
use crate::constants::components;
use crate::error::{ChangeflowError, ErrorCategory, Result};
use crate::events::StorageEvent;
use crate::logging::{log_error, log_reconcile_operation};
use crate::messaging::{QueueService, RawMessage};
use crate::models::TenantContext;
use crate::resilience::{with_timeout, BackoffPolicy};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

pub struct TenantConsumer {
    tenant: Arc<TenantContext>,
    processor: Arc<TenantEventProcessor>,
    queue: Arc<dyn QueueService>,
    queue_config: QueueConfig,
    backoff: BackoffPolicy,
    max_concurrent: usize,
    queue_timeout: Duration,
}

impl TenantConsumer {
    pub fn new(
        tenant: Arc<TenantContext>,
        processor: Arc<TenantEventProcessor>,
        queue: Arc<dyn QueueService>,
        queue_config: QueueConfig,
        backoff: BackoffPolicy,
        max_concurrent: usize,
        timeouts: &TimeoutConfig,
    ) -> Self {
        Self {
            tenant,
            processor,
            queue,
            queue_config,
            backoff,
            max_concurrent: max_concurrent.max(1),
            queue_timeout: timeouts.queue(),
        }
    }

    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    /// Receive one batch and settle every message in it
    #[instrument(skip(self), fields(tenant_code = %self.tenant.tenant_code))]
    pub async fn poll_once(&self) -> Result<PollSummary> {
        let messages = with_timeout(
            "queue.receive",
            self.queue_timeout,
            self.queue.receive(
                &self.tenant.queue_name,
                self.queue_config.batch_size,
                self.queue_config.visibility_timeout(),
            ),
        )
        .await?;

        let mut summary = PollSummary {
            received: messages.len(),
            ..PollSummary::default()
        };
        if messages.is_empty() {
            return Ok(summary);
        }

        let dispositions: Vec<MessageDisposition> = stream::iter(messages)
            .map(|message| self.handle_message(message))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;
        for disposition in dispositions {
            summary.record(disposition);
        }

        debug!(
            tenant_code = %self.tenant.tenant_code,
            received = summary.received,
            acknowledged = summary.acknowledged,
            retrying = summary.retrying,
            dead_lettered = summary.dead_lettered,
            "Poll complete"
        );
        Ok(summary)
    }

    /// Poll until `shutdown` flips to true. Poll errors are logged and retried
    /// after the poll interval; they never end the loop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            tenant_code = %self.tenant.tenant_code,
            queue = %self.tenant.queue_name,
            max_concurrent = self.max_concurrent,
            "Tenant consumer started"
        );

        while !*shutdown.borrow() {
            let idle = match self.poll_once().await {
                Ok(summary) => summary.is_idle(),
                Err(err) => {
                    log_error(
                        components::CONSUMER,
                        "poll",
                        &err.to_string(),
                        Some(&self.tenant.tenant_code),
                        None,
                    );
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = shutdown.changed() => {}
                    _ = tokio::time::sleep(self.queue_config.poll_interval()) => {}
                }
            }
        }

        info!(tenant_code = %self.tenant.tenant_code, "Tenant consumer stopped");
    }

    async fn handle_message(&self, message: RawMessage) -> MessageDisposition {
        let result = match message.decode::<StorageEvent>() {
            Ok(delivery) => self
                .processor
                .process(&self.tenant, &delivery.payload)
                .await
                .map(|outcome| {
                    debug!(
                        message_id = %message.message_id,
                        outcome = outcome.label(),
                        "Event processed"
                    );
                }),
            Err(err) => Err(ChangeflowError::from(err)),
        };

        let settled = match result {
            Ok(()) => self.acknowledge(&message).await,
            Err(err) => self.settle_failure(&message, &err).await,
        };

        settled.unwrap_or_else(|err| {
            // The message becomes visible again once its timeout lapses
            warn!(
                tenant_code = %self.tenant.tenant_code,
                message_id = %message.message_id,
                error = %err,
                "Failed to settle message"
            );
            MessageDisposition::LeftForRedrive
        })
    }

    async fn acknowledge(&self, message: &RawMessage) -> Result<MessageDisposition> {
        with_timeout(
            "queue.ack",
            self.queue_timeout,
            self.queue.ack(&self.tenant.queue_name, &message.receipt),
        )
        .await?;
        Ok(MessageDisposition::Acknowledged)
    }

    async fn settle_failure(
        &self,
        message: &RawMessage,
        err: &ChangeflowError,
    ) -> Result<MessageDisposition> {
        let category = err.category();
        log_reconcile_operation(
            "process",
            &self.tenant.tenant_code,
            None,
            "failed",
            Some(&format!(
                "message {} attempt {}: {err}",
                message.message_id, message.receive_count
            )),
        );

        match category {
            ErrorCategory::Transient => {
                let delay = self.backoff.delay_for_attempt(message.receive_count);
                with_timeout(
                    "queue.extend_visibility",
                    self.queue_timeout,
                    self.queue
                        .extend_visibility(&self.tenant.queue_name, &message.receipt, delay),
                )
                .await?;
                Ok(MessageDisposition::Retrying { delay })
            }
            ErrorCategory::Validation | ErrorCategory::Fatal => {
                log_error(
                    components::CONSUMER,
                    "process",
                    &err.to_string(),
                    Some(&self.tenant.tenant_code),
                    None,
                );
                if self.queue_config.dead_letter_fatal_immediately {
                    with_timeout(
                        "queue.dead_letter",
                        self.queue_timeout,
                        self.queue.dead_letter(
                            &self.tenant.queue_name,
                            &message.receipt,
                            &err.to_string(),
                        ),
                    )
                    .await?;
                    Ok(MessageDisposition::DeadLettered)
                } else {
                    Ok(MessageDisposition::LeftForRedrive)
                }
            }
        }
    }
}
