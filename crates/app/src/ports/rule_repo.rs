//! Rule repository port — persistence for automation rules.

use std::future::Future;

use wareflow_domain::error::WareflowError;
use wareflow_domain::event::EventKind;
use wareflow_domain::id::{RuleId, TenantId};
use wareflow_domain::rule::AutomationRule;
use wareflow_domain::time::Timestamp;

/// Repository for persisting and querying [`AutomationRule`]s.
pub trait RuleRepository {
    /// Create a new rule in storage.
    fn create(
        &self,
        rule: AutomationRule,
    ) -> impl Future<Output = Result<AutomationRule, WareflowError>> + Send;

    /// Get a rule by its unique identifier.
    fn get_by_id(
        &self,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<AutomationRule>, WareflowError>> + Send;

    /// Get all rules for a tenant.
    fn get_all(
        &self,
        tenant_id: TenantId,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, WareflowError>> + Send;

    /// Get the active event rules watching the given entity type and event
    /// kind for a tenant — the dispatcher's candidate query.
    fn find_active_event_rules(
        &self,
        tenant_id: TenantId,
        entity_type: String,
        event: EventKind,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, WareflowError>> + Send;

    /// Update an existing rule.
    fn update(
        &self,
        rule: AutomationRule,
    ) -> impl Future<Output = Result<AutomationRule, WareflowError>> + Send;

    /// Delete a rule. Execution history referencing the rule is deleted
    /// with it (cascade).
    fn delete(&self, id: RuleId) -> impl Future<Output = Result<(), WareflowError>> + Send;

    /// Update the cached next fire time for a schedule rule.
    fn set_next_scheduled(
        &self,
        id: RuleId,
        next: Option<Timestamp>,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send;
}

impl<T: RuleRepository + Send + Sync> RuleRepository for std::sync::Arc<T> {
    fn create(
        &self,
        rule: AutomationRule,
    ) -> impl Future<Output = Result<AutomationRule, WareflowError>> + Send {
        (**self).create(rule)
    }

    fn get_by_id(
        &self,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<AutomationRule>, WareflowError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(
        &self,
        tenant_id: TenantId,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, WareflowError>> + Send {
        (**self).get_all(tenant_id)
    }

    fn find_active_event_rules(
        &self,
        tenant_id: TenantId,
        entity_type: String,
        event: EventKind,
    ) -> impl Future<Output = Result<Vec<AutomationRule>, WareflowError>> + Send {
        (**self).find_active_event_rules(tenant_id, entity_type, event)
    }

    fn update(
        &self,
        rule: AutomationRule,
    ) -> impl Future<Output = Result<AutomationRule, WareflowError>> + Send {
        (**self).update(rule)
    }

    fn delete(&self, id: RuleId) -> impl Future<Output = Result<(), WareflowError>> + Send {
        (**self).delete(id)
    }

    fn set_next_scheduled(
        &self,
        id: RuleId,
        next: Option<Timestamp>,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        (**self).set_next_scheduled(id, next)
    }
}
