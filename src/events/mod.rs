pub mod notification;
pub mod origin_filter;
pub mod router;

// Re-export key types for convenience
pub use notification::{StorageEvent, StorageEventKind};
pub use origin_filter::{EventOriginFilter, OriginDecision};
pub use router::TriggerNotificationRouter;
