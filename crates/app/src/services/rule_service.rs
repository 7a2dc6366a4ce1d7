//! Rule service — use-cases for managing and manually driving rules.
//!
//! Configuration errors (invalid cron, unknown timezone, malformed
//! conditions) are rejected here at save time so they can never surface
//! at fire time. Activating a schedule rule computes its next fire time
//! and queues the corresponding durable job.

use std::sync::Arc;

use wareflow_domain::error::{NotFoundError, WareflowError};
use wareflow_domain::execution::{FiredBy, RuleExecution};
use wareflow_domain::id::RuleId;
use wareflow_domain::job::ScheduledJob;
use wareflow_domain::rule::{ActionConfig, AutomationRule, ConditionCheck};
use wareflow_domain::snapshot::Snapshot;
use wareflow_domain::time;

use crate::ports::{ExecutionStore, RuleRepository, ScheduledJobRepository, TemplateRepository};
use crate::runner::RuleRunner;

/// Outcome of a manual trigger request.
///
/// Expected business conditions (rule disabled, conditions false) are
/// explicit result states, not errors.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// The rule fired; here is its execution record.
    Fired(Box<RuleExecution>),
    /// The rule's conditions did not match the supplied snapshot; no
    /// execution was recorded.
    NotMatched,
    /// The rule is disabled; no execution was recorded.
    Inactive,
}

/// Side-effect-free preview of what a rule would do for a sample snapshot.
#[derive(Debug)]
pub struct RulePreview {
    /// Per-condition outcomes, in rule order (display form + result).
    pub conditions: Vec<(String, ConditionCheck)>,
    /// Whether every condition passed.
    pub matched: bool,
    /// The action after template resolution, when resolution succeeds.
    pub resolved_action: Option<ActionConfig>,
    /// Resolution failure (missing template, broken override merge).
    pub action_error: Option<String>,
}

/// Application service for rule CRUD and the manual operator surface.
pub struct RuleService<R, X, T, J> {
    runner: Arc<RuleRunner<R, X, T>>,
    jobs: J,
}

impl<R, X, T, J> RuleService<R, X, T, J>
where
    R: RuleRepository + Send + Sync,
    X: ExecutionStore + Send + Sync,
    T: TemplateRepository + Send + Sync,
    J: ScheduledJobRepository + Send + Sync,
{
    /// Create a service sharing the engine's runner and job store.
    pub fn new(runner: Arc<RuleRunner<R, X, T>>, jobs: J) -> Self {
        Self { runner, jobs }
    }

    /// Create a new rule after validating domain invariants. Active
    /// schedule rules get their next fire time computed and a pending job
    /// queued.
    ///
    /// # Errors
    ///
    /// Returns [`WareflowError::Validation`] or [`WareflowError::Schedule`]
    /// if invariants fail, or a storage error from the repository.
    #[tracing::instrument(skip(self, rule), fields(rule_name = %rule.name))]
    pub async fn create_rule(
        &self,
        mut rule: AutomationRule,
    ) -> Result<AutomationRule, WareflowError> {
        rule.validate()?;
        let next = self.compute_next(&rule)?;
        rule.next_scheduled_at = next;
        let rule = self.runner.rules().create(rule).await?;
        if let Some(next) = next {
            self.jobs
                .upsert_next(ScheduledJob::pending(rule.id, rule.tenant_id, next))
                .await?;
        }
        Ok(rule)
    }

    /// Look up a rule by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`WareflowError::NotFound`] when no rule with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_rule(&self, id: RuleId) -> Result<AutomationRule, WareflowError> {
        self.runner.rules().get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "AutomationRule",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all rules for a tenant.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_rules(
        &self,
        tenant_id: wareflow_domain::id::TenantId,
    ) -> Result<Vec<AutomationRule>, WareflowError> {
        self.runner.rules().get_all(tenant_id).await
    }

    /// Update an existing rule, re-validating and re-queueing its schedule.
    /// Disabling a schedule rule removes its pending job; re-enabling
    /// queues a fresh one from the current time.
    ///
    /// # Errors
    ///
    /// Returns [`WareflowError::Validation`] or [`WareflowError::Schedule`]
    /// if invariants fail, or a storage error from the repository.
    #[tracing::instrument(skip(self, rule), fields(rule_id = %rule.id))]
    pub async fn update_rule(
        &self,
        mut rule: AutomationRule,
    ) -> Result<AutomationRule, WareflowError> {
        rule.validate()?;
        let next = self.compute_next(&rule)?;
        rule.next_scheduled_at = next;
        let rule = self.runner.rules().update(rule).await?;
        match next {
            Some(next) => {
                self.jobs
                    .upsert_next(ScheduledJob::pending(rule.id, rule.tenant_id, next))
                    .await?;
            }
            None => self.jobs.delete_for_rule(rule.id).await?,
        }
        Ok(rule)
    }

    /// Enable or disable a rule.
    ///
    /// # Errors
    ///
    /// Returns [`WareflowError::NotFound`] or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn set_active(
        &self,
        id: RuleId,
        is_active: bool,
    ) -> Result<AutomationRule, WareflowError> {
        let mut rule = self.get_rule(id).await?;
        rule.is_active = is_active;
        self.update_rule(rule).await
    }

    /// Delete a rule and its pending jobs. Execution history cascades in
    /// storage.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn delete_rule(&self, id: RuleId) -> Result<(), WareflowError> {
        self.jobs.delete_for_rule(id).await?;
        self.runner.rules().delete(id).await
    }

    /// Fire a rule right now against the supplied snapshot (empty when
    /// omitted). Conditions are evaluated like any other dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`WareflowError::NotFound`] for an unknown rule, or a
    /// storage error.
    #[tracing::instrument(skip(self, snapshot))]
    pub async fn trigger_now(
        &self,
        id: RuleId,
        snapshot: Option<Snapshot>,
    ) -> Result<TriggerOutcome, WareflowError> {
        let rule = self.get_rule(id).await?;
        if !rule.is_active {
            return Ok(TriggerOutcome::Inactive);
        }
        let snapshot = snapshot.unwrap_or_default();
        if !wareflow_domain::rule::evaluate_all(&rule.conditions, &snapshot) {
            return Ok(TriggerOutcome::NotMatched);
        }
        let execution = self
            .runner
            .run_rule(&rule, snapshot, FiredBy::Manual, None)
            .await?;
        Ok(TriggerOutcome::Fired(Box::new(execution)))
    }

    /// Dry-run a rule against a sample snapshot: evaluate each condition
    /// and resolve the action (template included) without executing
    /// anything or recording an execution.
    ///
    /// # Errors
    ///
    /// Returns [`WareflowError::NotFound`] for an unknown rule, or a
    /// storage error from template lookup.
    #[tracing::instrument(skip(self, snapshot))]
    pub async fn test_rule(
        &self,
        id: RuleId,
        snapshot: Snapshot,
    ) -> Result<RulePreview, WareflowError> {
        let rule = self.get_rule(id).await?;
        let conditions: Vec<_> = rule
            .conditions
            .iter()
            .map(|condition| (condition.to_string(), condition.check(&snapshot)))
            .collect();
        let matched = conditions.iter().all(|(_, check)| check.passed());
        let (resolved_action, action_error) = match self.runner.resolve_action(&rule).await {
            Ok(config) => (Some(config), None),
            Err(err) => (None, Some(err.to_string())),
        };
        Ok(RulePreview {
            conditions,
            matched,
            resolved_action,
            action_error,
        })
    }

    /// Next fire time for active schedule rules; `None` otherwise.
    fn compute_next(
        &self,
        rule: &AutomationRule,
    ) -> Result<Option<wareflow_domain::time::Timestamp>, WareflowError> {
        if !rule.is_active {
            return Ok(None);
        }
        match rule.trigger.schedule() {
            Some(schedule) => Ok(Some(schedule.next_fire_time(time::now())?)),
            None => Ok(None),
        }
    }
}
