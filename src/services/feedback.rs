use super::errors::ServiceResult;
use crate::models::{DomainObject, SurveyReference, TenantContext};
use async_trait::async_trait;

/// Creates the post-completion feedback survey linked from the completion email
#[async_trait]
pub trait FeedbackService: Send + Sync {
    async fn create_survey(
        &self,
        tenant: &TenantContext,
        object: &DomainObject,
    ) -> ServiceResult<SurveyReference>;
}
