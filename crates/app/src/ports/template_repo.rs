//! Template repository port — persistence for action templates.

use std::future::Future;

use wareflow_domain::error::WareflowError;
use wareflow_domain::id::{TemplateId, TenantId};
use wareflow_domain::template::ActionTemplate;

/// Repository for tenant-scoped [`ActionTemplate`]s.
pub trait TemplateRepository {
    /// Create a new template in storage.
    fn create(
        &self,
        template: ActionTemplate,
    ) -> impl Future<Output = Result<ActionTemplate, WareflowError>> + Send;

    /// Get a template by its unique identifier.
    fn get_by_id(
        &self,
        id: TemplateId,
    ) -> impl Future<Output = Result<Option<ActionTemplate>, WareflowError>> + Send;

    /// Look a template up by its per-tenant code.
    fn find_by_code(
        &self,
        tenant_id: TenantId,
        code: String,
    ) -> impl Future<Output = Result<Option<ActionTemplate>, WareflowError>> + Send;

    /// Get all templates for a tenant.
    fn get_all(
        &self,
        tenant_id: TenantId,
    ) -> impl Future<Output = Result<Vec<ActionTemplate>, WareflowError>> + Send;

    /// Update an existing template.
    fn update(
        &self,
        template: ActionTemplate,
    ) -> impl Future<Output = Result<ActionTemplate, WareflowError>> + Send;

    /// Delete a template by its unique identifier.
    fn delete(&self, id: TemplateId) -> impl Future<Output = Result<(), WareflowError>> + Send;
}

impl<T: TemplateRepository + Send + Sync> TemplateRepository for std::sync::Arc<T> {
    fn create(
        &self,
        template: ActionTemplate,
    ) -> impl Future<Output = Result<ActionTemplate, WareflowError>> + Send {
        (**self).create(template)
    }

    fn get_by_id(
        &self,
        id: TemplateId,
    ) -> impl Future<Output = Result<Option<ActionTemplate>, WareflowError>> + Send {
        (**self).get_by_id(id)
    }

    fn find_by_code(
        &self,
        tenant_id: TenantId,
        code: String,
    ) -> impl Future<Output = Result<Option<ActionTemplate>, WareflowError>> + Send {
        (**self).find_by_code(tenant_id, code)
    }

    fn get_all(
        &self,
        tenant_id: TenantId,
    ) -> impl Future<Output = Result<Vec<ActionTemplate>, WareflowError>> + Send {
        (**self).get_all(tenant_id)
    }

    fn update(
        &self,
        template: ActionTemplate,
    ) -> impl Future<Output = Result<ActionTemplate, WareflowError>> + Send {
        (**self).update(template)
    }

    fn delete(&self, id: TemplateId) -> impl Future<Output = Result<(), WareflowError>> + Send {
        (**self).delete(id)
    }
}
