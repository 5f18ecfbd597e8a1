use super::errors::MessagingResult;
use super::message::{MessageId, QueueMessage, QueueStats, RawMessage, ReceiptHandle};
use async_trait::async_trait;
use std::time::Duration;

/// At-least-once queue with visibility-timeout redelivery and a dead-letter
/// queue. One queue per tenant.
#[async_trait]
pub trait QueueService: Send + Sync {
    async fn ensure_queue(&self, queue_name: &str) -> MessagingResult<()>;

    async fn send(&self, queue_name: &str, body: Vec<u8>) -> MessagingResult<MessageId>;

    /// Receive up to `max_messages`, hiding them for `visibility_timeout`
    async fn receive(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> MessagingResult<Vec<RawMessage>>;

    /// Delete a delivered message
    async fn ack(&self, queue_name: &str, receipt: &ReceiptHandle) -> MessagingResult<()>;

    /// Push a delivered message's next redelivery out by `timeout` from now
    async fn extend_visibility(
        &self,
        queue_name: &str,
        receipt: &ReceiptHandle,
        timeout: Duration,
    ) -> MessagingResult<()>;

    /// Move a delivered message to the dead-letter queue right away
    async fn dead_letter(
        &self,
        queue_name: &str,
        receipt: &ReceiptHandle,
        reason: &str,
    ) -> MessagingResult<()>;

    async fn queue_stats(&self, queue_name: &str) -> MessagingResult<QueueStats>;

    fn provider_name(&self) -> &'static str;
}

/// Serialize and send a typed message
pub async fn send_message<Q, T>(queue: &Q, queue_name: &str, message: &T) -> MessagingResult<MessageId>
where
    Q: QueueService + ?Sized,
    T: QueueMessage,
{
    let body = message.to_bytes()?;
    queue.send(queue_name, body).await
}
