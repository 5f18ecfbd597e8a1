//! # Event Origin Filter
//!
//! Breaks the write → notify → process → write loop by discarding events whose
//! writer is the engine itself. Pure and O(1): it runs before any I/O.
//!
//! Absent or malformed writer identities fail open and are processed, since a
//! missing identity is far more likely to come from an external actor.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginDecision {
    Process,
    Discard,
}

#[derive(Debug, Clone)]
pub struct EventOriginFilter {
    engine_identities: HashSet<String>,
}

impl EventOriginFilter {
    pub fn new<I, S>(engine_identities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let engine_identities = engine_identities
            .into_iter()
            .filter_map(|identity| normalize(identity.as_ref()).map(str::to_string))
            .collect();
        Self { engine_identities }
    }

    pub fn evaluate(&self, writer_identity: Option<&str>) -> OriginDecision {
        match writer_identity.and_then(normalize) {
            Some(identity) if self.engine_identities.contains(identity) => OriginDecision::Discard,
            _ => OriginDecision::Process,
        }
    }

    pub fn is_engine_write(&self, writer_identity: Option<&str>) -> bool {
        self.evaluate(writer_identity) == OriginDecision::Discard
    }
}

/// Trimmed identity, or `None` when blank or containing control characters
fn normalize(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_control) {
        None
    } else {
        Some(trimmed)
    }
}
