//! Scheduled job — a durable "wake me at time T to run rule R" marker.
//!
//! Jobs are decoupled from executions so schedule computation and action
//! execution are independently retryable. At most one pending job exists
//! per rule; the scheduler supersedes the old job when it computes the
//! next occurrence. Claiming is an atomic compare-and-set in the store —
//! the only place the engine needs true concurrency control.

use serde::{Deserialize, Serialize};

use crate::id::{JobId, RuleId, TenantId};
use crate::time::Timestamp;

/// Lifecycle status of a [`ScheduledJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Claimed,
    Done,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A durable marker for the next due occurrence of a schedule rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: JobId,
    pub rule_id: RuleId,
    pub tenant_id: TenantId,
    /// UTC instant at which the rule becomes due.
    pub scheduled_for: Timestamp,
    pub status: JobStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    /// When a worker claimed the job; used by the janitor to reclaim
    /// jobs whose worker died mid-run.
    #[serde(default)]
    pub claimed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl ScheduledJob {
    /// Create a pending job for the given rule and fire time.
    #[must_use]
    pub fn pending(rule_id: RuleId, tenant_id: TenantId, scheduled_for: Timestamp) -> Self {
        Self {
            id: JobId::new(),
            rule_id,
            tenant_id,
            scheduled_for,
            status: JobStatus::Pending,
            error_message: None,
            claimed_at: None,
            created_at: crate::time::now(),
        }
    }

    /// Whether the job is due at `now`.
    #[must_use]
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.status == JobStatus::Pending && self.scheduled_for <= now
    }

    /// Whether a claimed job's lease has expired at `now`.
    #[must_use]
    pub fn lease_expired(&self, now: Timestamp, lease: chrono::Duration) -> bool {
        self.status == JobStatus::Claimed
            && self
                .claimed_at
                .is_some_and(|claimed_at| now - claimed_at > lease)
    }
}
