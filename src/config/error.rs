//! Configuration Error Types
//!
//! Errors raised while loading and validating engine configuration.

use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Underlying source could not be read or deserialized
    #[error("Failed to load configuration from {source_name}: {error}")]
    LoadFailed { source_name: String, error: String },

    /// Missing required configuration field
    #[error("Missing required configuration field '{field}' in {context}")]
    MissingRequiredField { field: String, context: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },

    /// The same tenant code configured twice
    #[error("Tenant '{tenant_code}' is configured more than once")]
    DuplicateTenant { tenant_code: String },
}

impl ConfigurationError {
    pub fn load_failed(source_name: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::LoadFailed {
            source_name: source_name.into(),
            error: error.to_string(),
        }
    }

    pub fn missing_required_field(field: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingRequiredField {
            field: field.into(),
            context: context.into(),
        }
    }

    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(err: config::ConfigError) -> Self {
        Self::load_failed("config sources", err)
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigurationError>;
