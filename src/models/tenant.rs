//! Tenant context resolved once per reconciliation and passed explicitly through
//! the handler chain.

use super::domain_object::ObjectKind;
use crate::config::TenantConfig;
use crate::services::NotificationType;
use crate::validation::{ValidationError, ValidationResult};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Credentials used to act inside a tenant environment
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TenantCredentials {
    pub role_reference: Option<String>,
    pub external_id: Option<String>,
}

impl fmt::Debug for TenantCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantCredentials")
            .field("role_reference", &self.role_reference)
            .field("external_id", &self.external_id.as_ref().map(|_| "[MASKED]"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub tenant_code: String,
    pub queue_name: String,
    pub topic_prefix: String,
    pub recipient_list_id: Option<String>,
    pub credentials: TenantCredentials,
}

impl TenantContext {
    pub fn from_config(config: &TenantConfig) -> Self {
        Self {
            tenant_code: config.code.clone(),
            queue_name: config.queue_name.clone(),
            topic_prefix: config.topic_prefix.clone(),
            recipient_list_id: config.recipient_list_id.clone(),
            credentials: TenantCredentials {
                role_reference: config.credentials.role_reference.clone(),
                external_id: config.credentials.external_id.clone(),
            },
        }
    }

    /// Subscription topic for one notification kind, e.g. `acme-change-approved`
    pub fn topic_for(&self, kind: ObjectKind, notification: NotificationType) -> String {
        let prefix = self.topic_prefix.trim_end_matches('-');
        if prefix.is_empty() {
            format!("{}-{}", kind.as_str(), notification.topic_suffix())
        } else {
            format!("{prefix}-{}-{}", kind.as_str(), notification.topic_suffix())
        }
    }
}

/// Lookup of configured tenants by code
#[derive(Debug, Clone, Default)]
pub struct TenantRegistry {
    tenants: HashMap<String, Arc<TenantContext>>,
}

impl TenantRegistry {
    pub fn from_config(tenants: &[TenantConfig]) -> Self {
        let tenants = tenants
            .iter()
            .map(|config| (config.code.clone(), Arc::new(TenantContext::from_config(config))))
            .collect();
        Self { tenants }
    }

    pub fn resolve(&self, tenant_code: &str) -> ValidationResult<Arc<TenantContext>> {
        self.tenants
            .get(tenant_code)
            .cloned()
            .ok_or_else(|| ValidationError::UnknownTenant {
                tenant_code: tenant_code.to_string(),
            })
    }

    pub fn tenants(&self) -> impl Iterator<Item = &Arc<TenantContext>> {
        self.tenants.values()
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}
