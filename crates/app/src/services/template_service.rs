//! Template service — use-cases for managing action templates.

use wareflow_domain::error::{NotFoundError, ValidationError, WareflowError};
use wareflow_domain::id::{TemplateId, TenantId};
use wareflow_domain::template::ActionTemplate;

use crate::ports::TemplateRepository;

/// Application service for action-template CRUD.
///
/// Enforces per-tenant code uniqueness at save time; the storage adapter
/// carries a unique index as a backstop.
pub struct TemplateService<T> {
    templates: T,
}

impl<T: TemplateRepository> TemplateService<T> {
    /// Create a new service backed by the given repository.
    pub fn new(templates: T) -> Self {
        Self { templates }
    }

    /// Create a template after validating invariants and code uniqueness.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateTemplateCode`] when the code is
    /// taken, other validation errors, or a storage error.
    #[tracing::instrument(skip(self, template), fields(code = %template.code))]
    pub async fn create_template(
        &self,
        template: ActionTemplate,
    ) -> Result<ActionTemplate, WareflowError> {
        template.validate()?;
        if self
            .templates
            .find_by_code(template.tenant_id, template.code.clone())
            .await?
            .is_some()
        {
            return Err(ValidationError::DuplicateTemplateCode(template.code).into());
        }
        self.templates.create(template).await
    }

    /// Look up a template by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`WareflowError::NotFound`] or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn get_template(&self, id: TemplateId) -> Result<ActionTemplate, WareflowError> {
        self.templates.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "ActionTemplate",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all templates for a tenant.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_templates(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<ActionTemplate>, WareflowError> {
        self.templates.get_all(tenant_id).await
    }

    /// Update an existing template, keeping its code unique per tenant.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateTemplateCode`] when renaming
    /// onto a taken code, other validation errors, or a storage error.
    #[tracing::instrument(skip(self, template), fields(template_id = %template.id))]
    pub async fn update_template(
        &self,
        template: ActionTemplate,
    ) -> Result<ActionTemplate, WareflowError> {
        template.validate()?;
        if let Some(existing) = self
            .templates
            .find_by_code(template.tenant_id, template.code.clone())
            .await?
        {
            if existing.id != template.id {
                return Err(ValidationError::DuplicateTemplateCode(template.code).into());
            }
        }
        self.templates.update(template).await
    }

    /// Delete a template by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn delete_template(&self, id: TemplateId) -> Result<(), WareflowError> {
        self.templates.delete(id).await
    }
}
