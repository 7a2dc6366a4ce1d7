//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`WareflowError`] via `#[from]`. Adapters wrap their infrastructure
//! errors into the [`WareflowError::Storage`] variant so the application
//! layer never depends on a concrete storage technology.

use crate::execution::TransitionError;
use crate::rule::ActionKind;
use crate::schedule::ScheduleError;

/// Top-level error for the wareflow engine.
#[derive(Debug, thiserror::Error)]
pub enum WareflowError {
    /// A domain invariant was violated.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A cron expression or timezone was rejected.
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// A referenced record does not exist.
    #[error("{0}")]
    NotFound(#[from] NotFoundError),

    /// An illegal execution status transition was attempted.
    #[error("execution transition error: {0}")]
    Transition(#[from] TransitionError),

    /// An infrastructure failure in a storage adapter.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Violations of domain invariants, rejected at save time.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A rule or template name is empty.
    #[error("name must not be empty")]
    EmptyName,

    /// An event rule is missing its entity type or event kind.
    #[error("event rules require both an entity type and an event kind")]
    MissingEventTrigger,

    /// A condition has an empty field path.
    #[error("condition field path must not be empty")]
    EmptyConditionField,

    /// A condition operator requires a comparison value but none was given.
    #[error("operator `{operator}` requires a value")]
    MissingConditionValue {
        /// Display form of the offending operator.
        operator: String,
    },

    /// A rule was built without an action.
    #[error("rules require an action")]
    MissingAction,

    /// An action template code is empty.
    #[error("template code must not be empty")]
    EmptyTemplateCode,

    /// Another template with the same code exists for this tenant.
    #[error("template code `{0}` already exists for this tenant")]
    DuplicateTemplateCode(String),

    /// A template's config JSON is not a valid tagged action.
    #[error("template config is not a valid action: {0}")]
    InvalidTemplateConfig(String),
}

/// A lookup by identifier found nothing.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of record that was looked up (e.g. `"AutomationRule"`).
    pub entity: &'static str,
    /// Stringified identifier that missed.
    pub id: String,
}

/// Failures raised while executing a rule's action.
///
/// These never cross module boundaries as panics or opaque strings: the
/// runner captures them into the execution record's status and error
/// message, isolated per rule.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// No handler is registered for this action kind.
    #[error("unsupported action kind `{0}`")]
    UnsupportedKind(ActionKind),

    /// A `TriggerRule` chain exceeded the configured maximum depth.
    #[error("action chain too deep (max depth {max_depth})")]
    ChainTooDeep {
        /// Depth limit that was exceeded.
        max_depth: u32,
    },

    /// The handler did not complete within its deadline.
    #[error("action timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The referenced action template does not exist for this tenant.
    #[error("action template `{code}` not found")]
    TemplateNotFound {
        /// Template code the rule referenced.
        code: String,
    },

    /// The merged template + overrides did not form a valid action config.
    #[error("invalid action configuration from template: {0}")]
    InvalidTemplateConfig(String),

    /// The handler itself reported a failure.
    #[error("{0}")]
    Handler(String),
}
