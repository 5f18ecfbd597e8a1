//! # Testing Support
//!
//! Fixtures and in-memory service doubles shared by unit tests, integration
//! tests and local development runs.

pub mod fixtures;
pub mod services;

pub use services::{
    InMemoryMeetingApi, RecordingFeedbackService, RecordingNotifier, SentNotification,
    StaticRecipientDirectory, TestServices,
};
