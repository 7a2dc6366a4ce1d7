//! Execution — one durable record per rule-firing attempt.
//!
//! Executions are append-only from the outside: status moves
//! `Pending → Running → terminal` and a terminal record is never mutated
//! again. The engine creates exactly one execution per fired-and-matched
//! rule, whatever the outcome.

use serde::{Deserialize, Serialize};

use crate::id::{ExecutionId, RuleId, TenantId};
use crate::rule::EntityRef;
use crate::snapshot::Snapshot;
use crate::time::Timestamp;

/// Lifecycle status of a [`RuleExecution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Terminal, but flagged for manual follow-up (e.g. a chained rule
    /// failed after the parent's own work succeeded).
    PartiallyFailed,
    Cancelled,
}

impl ExecutionStatus {
    /// Whether this status ends the execution's lifecycle.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::PartiallyFailed | Self::Cancelled
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::PartiallyFailed => "partially_failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// How the rule came to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiredBy {
    Event,
    Schedule,
    Manual,
    /// Fired as the target of another rule's `TriggerRule` action.
    Chain,
}

impl std::fmt::Display for FiredBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Event => "event",
            Self::Schedule => "schedule",
            Self::Manual => "manual",
            Self::Chain => "chain",
        };
        f.write_str(name)
    }
}

/// An attempted status transition that the lifecycle forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot transition execution from {from} to {to}")]
pub struct TransitionError {
    pub from: ExecutionStatus,
    pub to: ExecutionStatus,
}

/// One attempt to fire a rule, with its input snapshot and outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleExecution {
    pub id: ExecutionId,
    pub rule_id: RuleId,
    pub tenant_id: TenantId,
    pub status: ExecutionStatus,
    pub fired_by: FiredBy,
    /// Entity type of the triggering event, when fired by an event.
    #[serde(default)]
    pub trigger_entity_type: Option<String>,
    /// Snapshot the conditions were evaluated against.
    pub snapshot: Snapshot,
    /// Structured action output.
    #[serde(default)]
    pub result_data: serde_json::Value,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Record created by the action, if any.
    #[serde(default)]
    pub created_entity: Option<EntityRef>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
}

impl RuleExecution {
    /// Create a new pending execution for a fired-and-matched rule.
    #[must_use]
    pub fn pending(
        rule_id: RuleId,
        tenant_id: TenantId,
        fired_by: FiredBy,
        trigger_entity_type: Option<String>,
        snapshot: Snapshot,
    ) -> Self {
        Self {
            id: ExecutionId::new(),
            rule_id,
            tenant_id,
            status: ExecutionStatus::Pending,
            fired_by,
            trigger_entity_type,
            snapshot,
            result_data: serde_json::Value::Null,
            error_message: None,
            created_entity: None,
            created_at: crate::time::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Move `Pending → Running`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] unless the execution is pending.
    pub fn start(&mut self, at: Timestamp) -> Result<(), TransitionError> {
        if self.status != ExecutionStatus::Pending {
            return Err(TransitionError {
                from: self.status,
                to: ExecutionStatus::Running,
            });
        }
        self.status = ExecutionStatus::Running;
        self.started_at = Some(at);
        Ok(())
    }

    /// Move into a terminal status, recording the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] when `status` is not terminal or the
    /// execution already reached a terminal status.
    pub fn finish(
        &mut self,
        status: ExecutionStatus,
        at: Timestamp,
    ) -> Result<(), TransitionError> {
        if !status.is_terminal() || self.status.is_terminal() {
            return Err(TransitionError {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        self.completed_at = Some(at);
        Ok(())
    }

    /// Shorthand: finish as `Failed` with an error message.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] if the execution is already terminal.
    pub fn fail(&mut self, error: impl Into<String>, at: Timestamp) -> Result<(), TransitionError> {
        self.error_message = Some(error.into());
        self.finish(ExecutionStatus::Failed, at)
    }
}
