use super::errors::ServiceResult;
use crate::models::TenantContext;
use async_trait::async_trait;

/// Read access to a tenant's recipient list subscriptions
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// Addresses currently subscribed to `topic` in the tenant's list
    async fn subscribers(&self, tenant: &TenantContext, topic: &str) -> ServiceResult<Vec<String>>;
}
