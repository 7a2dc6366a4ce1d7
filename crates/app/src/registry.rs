//! Action handler registry — pluggable dispatch keyed by action kind.
//!
//! Surrounding modules register a handler per [`ActionKind`] at the
//! composition root. A kind without a registered handler produces a
//! Failed execution with `UnsupportedKind`, never a crash.

use std::collections::HashMap;
use std::sync::Arc;

use wareflow_domain::error::ActionError;
use wareflow_domain::id::{ExecutionId, RuleId, TenantId};
use wareflow_domain::rule::{ActionConfig, ActionKind, ActionOutput};
use wareflow_domain::snapshot::Snapshot;

/// Execution context threaded through handlers.
///
/// `depth` counts `TriggerRule` chain hops; the runner refuses to chain
/// past the configured maximum.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub tenant_id: TenantId,
    pub rule_id: RuleId,
    pub execution_id: ExecutionId,
    /// Snapshot the rule's conditions were evaluated against.
    pub snapshot: Snapshot,
    /// Current chain depth; `0` for a directly triggered rule.
    pub depth: u32,
}

/// One pluggable action implementation.
///
/// Handlers performing external IO must respect the caller's deadline —
/// the runner wraps every invocation in a timeout and treats an elapsed
/// deadline as a typed failure.
#[async_trait::async_trait]
pub trait ActionHandler: Send + Sync {
    /// Execute the resolved configuration, reporting side effects in the
    /// returned [`ActionOutput`].
    async fn execute(
        &self,
        config: &ActionConfig,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, ActionError>;
}

/// Map from action kind to its registered handler.
#[derive(Default)]
pub struct ActionRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the handler for a kind.
    pub fn register(&mut self, kind: ActionKind, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Look up the handler for a kind.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::UnsupportedKind`] when nothing is registered.
    pub fn get(&self, kind: ActionKind) -> Result<Arc<dyn ActionHandler>, ActionError> {
        self.handlers
            .get(&kind)
            .cloned()
            .ok_or(ActionError::UnsupportedKind(kind))
    }

    /// Kinds with a registered handler.
    #[must_use]
    pub fn registered_kinds(&self) -> Vec<ActionKind> {
        self.handlers.keys().copied().collect()
    }
}
