//! # In-Memory Queue Provider
//!
//! Process-local queue with the delivery semantics the engine relies on:
//! at-least-once delivery, visibility timeouts, per-message receive counts and
//! a redrive policy that moves a message to the dead-letter queue once it has
//! been received `max_receive_count` times without being acknowledged.
//!
//! Used for development and tests. Time is measured with `tokio::time` so tests
//! can run on a paused clock.

use super::errors::{MessagingError, MessagingResult};
use super::message::{MessageId, QueueStats, RawMessage, ReceiptHandle};
use super::service::QueueService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredMessage {
    id: MessageId,
    body: Vec<u8>,
    sent_at: DateTime<Utc>,
    receive_count: u32,
    visible_at: Instant,
    receipt: Option<ReceiptHandle>,
}

/// A message captured by the dead-letter queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub message_id: MessageId,
    pub body: Vec<u8>,
    pub receive_count: u32,
    pub reason: String,
}

#[derive(Debug, Default)]
struct QueueState {
    messages: VecDeque<StoredMessage>,
    dead_letters: Vec<DeadLetter>,
}

#[derive(Debug)]
pub struct InMemoryQueueService {
    queues: Mutex<HashMap<String, QueueState>>,
    max_receive_count: u32,
}

impl InMemoryQueueService {
    pub fn new(max_receive_count: u32) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            max_receive_count: max_receive_count.max(1),
        }
    }

    pub fn max_receive_count(&self) -> u32 {
        self.max_receive_count
    }

    /// Messages captured by the queue's dead-letter queue
    pub fn dead_letters(&self, queue_name: &str) -> Vec<DeadLetter> {
        self.queues
            .lock()
            .get(queue_name)
            .map(|state| state.dead_letters.clone())
            .unwrap_or_default()
    }

    /// Make every in-flight message visible again, as if its timeout elapsed
    pub fn expire_visibility(&self, queue_name: &str) {
        let now = Instant::now();
        if let Some(state) = self.queues.lock().get_mut(queue_name) {
            for message in state.messages.iter_mut() {
                message.visible_at = now;
            }
        }
    }

    fn with_queue<T>(
        &self,
        queue_name: &str,
        f: impl FnOnce(&mut QueueState) -> MessagingResult<T>,
    ) -> MessagingResult<T> {
        let mut queues = self.queues.lock();
        let state = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;
        f(state)
    }
}

fn position_of(state: &QueueState, receipt: &ReceiptHandle) -> Option<usize> {
    state
        .messages
        .iter()
        .position(|message| message.receipt.as_ref() == Some(receipt))
}

#[async_trait]
impl QueueService for InMemoryQueueService {
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()> {
        if queue_name.trim().is_empty() {
            return Err(MessagingError::invalid_queue_name(
                queue_name,
                "queue name must be non-empty",
            ));
        }
        self.queues.lock().entry(queue_name.to_string()).or_default();
        Ok(())
    }

    async fn send(&self, queue_name: &str, body: Vec<u8>) -> MessagingResult<MessageId> {
        self.with_queue(queue_name, |state| {
            let id = MessageId(Uuid::new_v4().to_string());
            state.messages.push_back(StoredMessage {
                id: id.clone(),
                body,
                sent_at: Utc::now(),
                receive_count: 0,
                visible_at: Instant::now(),
                receipt: None,
            });
            debug!(queue = %queue_name, message_id = %id, "Message enqueued");
            Ok(id)
        })
    }

    async fn receive(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> MessagingResult<Vec<RawMessage>> {
        let max_receive_count = self.max_receive_count;
        self.with_queue(queue_name, |state| {
            let now = Instant::now();
            let mut delivered = Vec::new();
            let mut index = 0;

            while index < state.messages.len() && delivered.len() < max_messages {
                if state.messages[index].visible_at > now {
                    index += 1;
                    continue;
                }

                if state.messages[index].receive_count >= max_receive_count {
                    if let Some(message) = state.messages.remove(index) {
                        warn!(
                            queue = %queue_name,
                            message_id = %message.id,
                            receive_count = message.receive_count,
                            "Redrive limit reached, moving message to dead-letter queue"
                        );
                        state.dead_letters.push(DeadLetter {
                            message_id: message.id,
                            body: message.body,
                            receive_count: message.receive_count,
                            reason: "max receive count exceeded".to_string(),
                        });
                    }
                    continue;
                }

                let message = &mut state.messages[index];
                let receipt = ReceiptHandle(Uuid::new_v4().to_string());
                message.receive_count += 1;
                message.visible_at = now + visibility_timeout;
                message.receipt = Some(receipt.clone());

                delivered.push(RawMessage {
                    message_id: message.id.clone(),
                    receipt,
                    receive_count: message.receive_count,
                    sent_at: message.sent_at,
                    payload: message.body.clone(),
                });
                index += 1;
            }

            Ok(delivered)
        })
    }

    async fn ack(&self, queue_name: &str, receipt: &ReceiptHandle) -> MessagingResult<()> {
        self.with_queue(queue_name, |state| {
            let index = position_of(state, receipt)
                .ok_or_else(|| MessagingError::receipt_invalid(queue_name, receipt.0.clone()))?;
            state.messages.remove(index);
            Ok(())
        })
    }

    async fn extend_visibility(
        &self,
        queue_name: &str,
        receipt: &ReceiptHandle,
        timeout: Duration,
    ) -> MessagingResult<()> {
        self.with_queue(queue_name, |state| {
            let index = position_of(state, receipt)
                .ok_or_else(|| MessagingError::receipt_invalid(queue_name, receipt.0.clone()))?;
            state.messages[index].visible_at = Instant::now() + timeout;
            Ok(())
        })
    }

    async fn dead_letter(
        &self,
        queue_name: &str,
        receipt: &ReceiptHandle,
        reason: &str,
    ) -> MessagingResult<()> {
        self.with_queue(queue_name, |state| {
            let index = position_of(state, receipt)
                .ok_or_else(|| MessagingError::receipt_invalid(queue_name, receipt.0.clone()))?;
            if let Some(message) = state.messages.remove(index) {
                state.dead_letters.push(DeadLetter {
                    message_id: message.id,
                    body: message.body,
                    receive_count: message.receive_count,
                    reason: reason.to_string(),
                });
            }
            Ok(())
        })
    }

    async fn queue_stats(&self, queue_name: &str) -> MessagingResult<QueueStats> {
        self.with_queue(queue_name, |state| {
            let now = Instant::now();
            let visible = state
                .messages
                .iter()
                .filter(|message| message.visible_at <= now)
                .count();
            Ok(QueueStats {
                visible,
                in_flight: state.messages.len() - visible,
                dead_lettered: state.dead_letters.len(),
            })
        })
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}
