//! # Resilience Module
//!
//! Bounded timeouts for every external call and capped exponential backoff for
//! redelivered events. Failures are never retried in-process beyond optimistic
//! archive writes; the queue's visibility timeout drives redelivery.

pub mod backoff;
pub mod timeout;

pub use backoff::BackoffPolicy;
pub use timeout::with_timeout;
