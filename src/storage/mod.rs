//! # Storage
//!
//! Object store abstraction plus the two views the engine takes of it: the
//! authoritative archive and the per-tenant trigger surface.

pub mod archive;
pub mod errors;
pub mod in_memory;
pub mod keys;
pub mod traits;
pub mod trigger;

pub use archive::{ArchiveRepository, ArchiveUpdate, LoadedArchive};
pub use errors::{StorageError, StorageResult};
pub use in_memory::{InMemoryObjectStore, StoreFault, StoreOperation};
pub use keys::{KeyLayout, TriggerRef};
pub use traits::{ObjectMetadata, ObjectStore, StoredObject, WriteCondition};
pub use trigger::{ConsumeOutcome, TriggerClaim, TriggerStore};
