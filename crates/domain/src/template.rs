//! Action template — a reusable, named action configuration.
//!
//! Rules may reference a template by code instead of embedding parameters
//! inline. Resolution happens at execution time: the template's config is
//! the base object and the rule's overrides replace top-level keys.

use serde::{Deserialize, Serialize};

use crate::error::{ActionError, ValidationError, WareflowError};
use crate::id::{TemplateId, TenantId};
use crate::rule::ActionConfig;

/// A tenant-scoped, reusable action configuration.
///
/// `code` is unique per tenant; the uniqueness itself is enforced by the
/// template store at save time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionTemplate {
    pub id: TemplateId,
    pub tenant_id: TenantId,
    /// Stable reference code, e.g. `"notify-ops"`.
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Tagged [`ActionConfig`] JSON; validated at save time.
    pub config: serde_json::Value,
}

impl ActionTemplate {
    /// Create a template with a fresh id.
    #[must_use]
    pub fn new(tenant_id: TenantId, code: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            id: TemplateId::new(),
            tenant_id,
            code: code.into(),
            description: None,
            config,
        }
    }

    /// Check domain invariants: non-empty code and a config that parses as
    /// a known [`ActionConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`WareflowError::Validation`] for an empty code or a config
    /// that is not a valid tagged action.
    pub fn validate(&self) -> Result<(), WareflowError> {
        if self.code.is_empty() {
            return Err(ValidationError::EmptyTemplateCode.into());
        }
        serde_json::from_value::<ActionConfig>(self.config.clone())
            .map_err(|err| ValidationError::InvalidTemplateConfig(err.to_string()))?;
        Ok(())
    }

    /// Resolve the template into an [`ActionConfig`], applying top-level
    /// key overrides from the referencing rule.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::InvalidTemplateConfig`] when the merged
    /// object no longer forms a valid action — the template alone is
    /// validated at save time, but an override can still break it.
    pub fn resolve(
        &self,
        overrides: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ActionConfig, ActionError> {
        let merged = merge_overrides(self.config.clone(), overrides);
        serde_json::from_value(merged)
            .map_err(|err| ActionError::InvalidTemplateConfig(err.to_string()))
    }
}

/// Merge override keys over a base JSON object (top-level replace).
#[must_use]
pub fn merge_overrides(
    base: serde_json::Value,
    overrides: &serde_json::Map<String, serde_json::Value>,
) -> serde_json::Value {
    let mut merged = match base {
        serde_json::Value::Object(fields) => fields,
        _ => serde_json::Map::new(),
    };
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    serde_json::Value::Object(merged)
}
