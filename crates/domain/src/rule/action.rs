//! Action — the effect executed when a rule fires.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::{ExecutionId, RuleId};

/// Discriminant of an [`ActionConfig`], used as the handler-registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateEntity,
    UpdateEntityField,
    SendNotification,
    InvokeWebhook,
    TriggerRule,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CreateEntity => "create_entity",
            Self::UpdateEntityField => "update_entity_field",
            Self::SendNotification => "send_notification",
            Self::InvokeWebhook => "invoke_webhook",
            Self::TriggerRule => "trigger_rule",
        };
        f.write_str(name)
    }
}

/// A resolved action configuration — the closed set of things a rule can do.
///
/// The engine never hard-codes knowledge of other modules' schemas: entity
/// payloads are opaque JSON handed to the registered handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionConfig {
    /// Create a record in another module (e.g. a `StockAdjustment`).
    CreateEntity {
        entity_type: String,
        /// Field values for the new record.
        #[serde(default)]
        fields: BTreeMap<String, serde_json::Value>,
    },
    /// Set a single field on an existing record.
    UpdateEntityField {
        entity_type: String,
        entity_id: String,
        field: String,
        value: serde_json::Value,
    },
    /// Send a notification through the configured delivery channel.
    SendNotification {
        recipient: String,
        subject: String,
        #[serde(default)]
        body: String,
    },
    /// POST a JSON payload to an external URL.
    InvokeWebhook {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        payload: serde_json::Value,
    },
    /// Chain into another rule by id, bounded by the max chain depth.
    TriggerRule { rule_id: RuleId },
}

impl ActionConfig {
    /// The registry key for this configuration.
    #[must_use]
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::CreateEntity { .. } => ActionKind::CreateEntity,
            Self::UpdateEntityField { .. } => ActionKind::UpdateEntityField,
            Self::SendNotification { .. } => ActionKind::SendNotification,
            Self::InvokeWebhook { .. } => ActionKind::InvokeWebhook,
            Self::TriggerRule { .. } => ActionKind::TriggerRule,
        }
    }
}

impl std::fmt::Display for ActionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateEntity { entity_type, .. } => write!(f, "create_entity({entity_type})"),
            Self::UpdateEntityField {
                entity_type, field, ..
            } => write!(f, "update_entity_field({entity_type}.{field})"),
            Self::SendNotification { recipient, .. } => {
                write!(f, "send_notification({recipient})")
            }
            Self::InvokeWebhook { url, .. } => write!(f, "invoke_webhook({url})"),
            Self::TriggerRule { rule_id } => write!(f, "trigger_rule({rule_id})"),
        }
    }
}

/// A rule's action: either inline parameters or a reference to a reusable
/// [`ActionTemplate`](crate::template::ActionTemplate), resolved at
/// execution time with template-as-default / inline-override merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ActionSpec {
    /// Parameters embedded in the rule itself.
    Inline { config: ActionConfig },
    /// Reference to a tenant-scoped template by code, with optional
    /// top-level key overrides applied over the template's config.
    Template {
        code: String,
        #[serde(default)]
        overrides: serde_json::Map<String, serde_json::Value>,
    },
}

impl ActionSpec {
    /// Wrap an [`ActionConfig`] inline.
    #[must_use]
    pub fn inline(config: ActionConfig) -> Self {
        Self::Inline { config }
    }
}

/// Pointer to a record an action produced, persisted for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: String,
}

/// Outcome reported by an action handler.
///
/// Handlers report side effects here so the execution recorder can persist
/// a durable pointer to what was produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionOutput {
    /// Structured handler output, stored in the execution record.
    #[serde(default)]
    pub result_data: serde_json::Value,
    /// Record created by the action, if any.
    #[serde(default)]
    pub created_entity: Option<EntityRef>,
    /// Execution of a chained rule, if this action triggered one.
    #[serde(default)]
    pub chained_execution: Option<ExecutionId>,
}

impl ActionOutput {
    /// Output carrying only result data.
    #[must_use]
    pub fn with_data(result_data: serde_json::Value) -> Self {
        Self {
            result_data,
            ..Self::default()
        }
    }

    /// Output recording a created entity.
    #[must_use]
    pub fn created(entity: EntityRef) -> Self {
        Self {
            result_data: serde_json::json!({
                "created_entity_type": entity.entity_type,
                "created_entity_id": entity.entity_id,
            }),
            created_entity: Some(entity),
            chained_execution: None,
        }
    }
}
