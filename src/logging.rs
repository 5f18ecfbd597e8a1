//! # Structured Logging Module
//!
//! Environment-aware structured logging. Every record produced on the
//! reconciliation path carries `object_id` and `tenant_code` so unresolved
//! backlog and dead-letter entries can be traced back to their events.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let json_output = std::env::var("CHANGEFLOW_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let layer = if json_output {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // A subscriber may already be installed by an embedding host
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json = json_output,
            "Structured logging initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("CHANGEFLOW_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log one step of a tenant reconciliation
pub fn log_reconcile_operation(
    operation: &str,
    tenant_code: &str,
    object_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        tenant_code = %tenant_code,
        object_id = object_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "RECONCILE_OPERATION"
    );
}

/// Log an outbound side effect (notification, meeting, survey)
pub fn log_side_effect(
    effect: &str,
    tenant_code: &str,
    object_id: &str,
    outcome: &str,
    details: Option<&str>,
) {
    tracing::info!(
        effect = %effect,
        tenant_code = %tenant_code,
        object_id = %object_id,
        outcome = %outcome,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "SIDE_EFFECT"
    );
}

/// Log error with full context
pub fn log_error(
    component: &str,
    operation: &str,
    error: &str,
    tenant_code: Option<&str>,
    object_id: Option<&str>,
) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        tenant_code = tenant_code,
        object_id = object_id,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
