//! Automation rule — trigger → condition → action, per tenant.
//!
//! Rules react to entity events, run on cron schedules, or fire manually.
//! Each rule has a [`Trigger`], optional AND-combined [`Condition`]s, and
//! exactly one [`ActionSpec`] executed when the conditions hold.

mod action;
mod condition;
mod trigger;

pub use action::{ActionConfig, ActionKind, ActionOutput, ActionSpec, EntityRef};
pub use condition::{evaluate_all, Condition, ConditionCheck, Operator, ValueType};
pub use trigger::Trigger;

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, WareflowError};
use crate::id::{RuleId, TenantId};
use crate::time::Timestamp;

/// A tenant-defined automation rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: RuleId,
    pub tenant_id: TenantId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub trigger: Trigger,
    pub conditions: Vec<Condition>,
    pub action: ActionSpec,
    /// Soft-disable flag; disabled rules are never fired, including for
    /// jobs queued before the rule was disabled.
    pub is_active: bool,
    /// Cached next fire time, maintained only for active schedule rules.
    #[serde(default)]
    pub next_scheduled_at: Option<Timestamp>,
}

impl AutomationRule {
    /// Create a builder for constructing an [`AutomationRule`].
    #[must_use]
    pub fn builder() -> AutomationRuleBuilder {
        AutomationRuleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`WareflowError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - an event trigger has an empty entity type
    ///   ([`ValidationError::MissingEventTrigger`])
    /// - a condition has an empty field or a missing required value
    ///
    /// Returns [`WareflowError::Schedule`] when a schedule trigger carries
    /// an invalid cron expression or unknown timezone — configuration
    /// errors are rejected at save time, never surfaced at fire time.
    pub fn validate(&self) -> Result<(), WareflowError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if let Trigger::EntityEvent { entity_type, .. } = &self.trigger {
            if entity_type.is_empty() {
                return Err(ValidationError::MissingEventTrigger.into());
            }
        }
        if let Some(schedule) = self.trigger.schedule() {
            schedule.validate()?;
        }
        for condition in &self.conditions {
            if condition.field.is_empty() {
                return Err(ValidationError::EmptyConditionField.into());
            }
            if condition.operator.requires_value() && condition.value.is_none() {
                return Err(ValidationError::MissingConditionValue {
                    operator: condition.operator.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// True when this is an active schedule rule.
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.is_active && matches!(self.trigger, Trigger::Schedule { .. })
    }
}

/// Step-by-step builder for [`AutomationRule`].
#[derive(Debug, Default)]
pub struct AutomationRuleBuilder {
    id: Option<RuleId>,
    tenant_id: Option<TenantId>,
    name: Option<String>,
    description: Option<String>,
    trigger: Option<Trigger>,
    conditions: Vec<Condition>,
    action: Option<ActionSpec>,
    is_active: Option<bool>,
    next_scheduled_at: Option<Timestamp>,
}

impl AutomationRuleBuilder {
    #[must_use]
    pub fn id(mut self, id: RuleId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn tenant_id(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn action(mut self, action: ActionSpec) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    #[must_use]
    pub fn next_scheduled_at(mut self, ts: Timestamp) -> Self {
        self.next_scheduled_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return an [`AutomationRule`].
    ///
    /// # Errors
    ///
    /// Returns [`WareflowError::Validation`] or [`WareflowError::Schedule`]
    /// if invariants fail.
    pub fn build(self) -> Result<AutomationRule, WareflowError> {
        let action = self
            .action
            .ok_or(ValidationError::MissingAction)
            .map_err(WareflowError::from)?;
        let rule = AutomationRule {
            id: self.id.unwrap_or_default(),
            tenant_id: self.tenant_id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description,
            trigger: self.trigger.unwrap_or(Trigger::Manual),
            conditions: self.conditions,
            action,
            is_active: self.is_active.unwrap_or(true),
            next_scheduled_at: self.next_scheduled_at,
        };
        rule.validate()?;
        Ok(rule)
    }
}
