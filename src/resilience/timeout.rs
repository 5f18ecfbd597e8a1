use crate::error::{ChangeflowError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run one external call under a bounded timeout.
///
/// The call's own error is converted into [`ChangeflowError`]; an elapsed
/// timeout becomes [`ChangeflowError::Timeout`], which is retryable so the
/// event is left for redelivery.
pub async fn with_timeout<T, E, F>(operation: &str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Into<ChangeflowError>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            let timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            warn!(operation = %operation, timeout_ms, "External call timed out");
            Err(ChangeflowError::timeout(operation, timeout_ms))
        }
    }
}
