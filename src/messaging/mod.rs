//! # Messaging Module
//!
//! Per-tenant queue abstraction with at-least-once delivery. Providers
//! implement [`QueueService`]; the in-memory provider backs development and
//! tests.

pub mod errors;
pub mod in_memory;
pub mod message;
pub mod service;

pub use errors::{MessagingError, MessagingResult};
pub use in_memory::{DeadLetter, InMemoryQueueService};
pub use message::{MessageId, QueueMessage, QueueStats, QueuedMessage, RawMessage, ReceiptHandle};
pub use service::{send_message, QueueService};
