//! Trigger dispatcher — the event-driven path.
//!
//! CRUD modules call [`TriggerDispatcher::on_entity_event`] after every
//! committed write. The dispatcher finds candidate rules, evaluates their
//! conditions, records one pending execution per match, and hands the
//! action work to a bounded worker pool so the caller is never blocked by
//! side effects. Non-matching rules are skipped without an execution
//! record, keeping history growth proportional to actual firings.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use wareflow_domain::error::WareflowError;
use wareflow_domain::event::EntityEvent;
use wareflow_domain::execution::{FiredBy, RuleExecution};
use wareflow_domain::id::ExecutionId;
use wareflow_domain::rule::{AutomationRule, ConditionCheck};
use wareflow_domain::snapshot::Snapshot;

use crate::ports::{ExecutionStore, RuleRepository, TemplateRepository};
use crate::runner::RuleRunner;

/// What one dispatch did: executions created for matched rules, and how
/// many candidates were skipped because their conditions did not hold.
#[derive(Debug, Default)]
pub struct DispatchSummary {
    pub matched: Vec<ExecutionId>,
    pub skipped: usize,
}

/// Reacts to entity events by firing matching rules.
pub struct TriggerDispatcher<R, X, T> {
    runner: Arc<RuleRunner<R, X, T>>,
    limiter: Arc<Semaphore>,
}

impl<R, X, T> TriggerDispatcher<R, X, T>
where
    R: RuleRepository + Send + Sync + 'static,
    X: ExecutionStore + Send + Sync + 'static,
    T: TemplateRepository + Send + Sync + 'static,
{
    /// Create a dispatcher around a shared runner.
    #[must_use]
    pub fn new(runner: Arc<RuleRunner<R, X, T>>) -> Self {
        let limiter = Arc::new(Semaphore::new(runner.config().max_concurrent_actions));
        Self { runner, limiter }
    }

    /// Process an entity event: evaluate candidates, record matches, and
    /// hand action execution to the worker pool (fire-and-continue).
    ///
    /// Failures of one rule's action never affect sibling rules — each
    /// matched rule runs in its own task and terminates in its own
    /// execution record.
    ///
    /// # Errors
    ///
    /// Returns a storage error if loading rules or recording the pending
    /// executions fails; action failures do not surface here.
    pub async fn on_entity_event(
        &self,
        event: &EntityEvent,
    ) -> Result<DispatchSummary, WareflowError> {
        let mut summary = DispatchSummary::default();
        let snapshot = event.evaluation_snapshot();

        for rule in self.candidates(event).await? {
            if !conditions_match(&rule, &snapshot) {
                summary.skipped += 1;
                continue;
            }
            let execution = self
                .runner
                .prepare(
                    &rule,
                    snapshot.clone(),
                    FiredBy::Event,
                    Some(event.entity_type.clone()),
                )
                .await?;
            summary.matched.push(execution.id);

            let runner = Arc::clone(&self.runner);
            let limiter = Arc::clone(&self.limiter);
            tokio::spawn(async move {
                let Ok(_permit) = limiter.acquire_owned().await else {
                    return;
                };
                if let Err(err) = runner.execute_prepared(&rule, execution).await {
                    error!(rule_id = %rule.id, error = %err, "failed to record execution outcome");
                }
            });
        }
        Ok(summary)
    }

    /// Like [`Self::on_entity_event`], but awaits every matched rule's
    /// execution and returns the terminal records. Used where the caller
    /// needs the outcomes (tests, synchronous integrations); per-rule
    /// isolation still holds.
    ///
    /// # Errors
    ///
    /// Returns a storage error if loading rules or recording executions
    /// fails.
    pub async fn process_event_now(
        &self,
        event: &EntityEvent,
    ) -> Result<Vec<RuleExecution>, WareflowError> {
        let snapshot = event.evaluation_snapshot();
        let mut executions = Vec::new();

        for rule in self.candidates(event).await? {
            if !conditions_match(&rule, &snapshot) {
                continue;
            }
            let execution = self
                .runner
                .prepare(
                    &rule,
                    snapshot.clone(),
                    FiredBy::Event,
                    Some(event.entity_type.clone()),
                )
                .await?;
            let execution = self.runner.execute_prepared(&rule, execution).await?;
            executions.push(execution);
        }
        Ok(executions)
    }

    async fn candidates(
        &self,
        event: &EntityEvent,
    ) -> Result<Vec<AutomationRule>, WareflowError> {
        let candidates = self
            .runner
            .rules()
            .find_active_event_rules(
                event.tenant_id,
                event.entity_type.clone(),
                event.kind.clone(),
            )
            .await?;
        debug!(
            entity_type = %event.entity_type,
            kind = %event.kind,
            count = candidates.len(),
            "dispatching entity event"
        );
        Ok(candidates)
    }
}

/// Evaluate a candidate's conditions, logging coercion failures (which
/// degrade to false, per the evaluation contract).
fn conditions_match(rule: &AutomationRule, snapshot: &Snapshot) -> bool {
    let mut all_pass = true;
    for condition in &rule.conditions {
        match condition.check(snapshot) {
            ConditionCheck::Pass => {}
            ConditionCheck::Fail => all_pass = false,
            ConditionCheck::CoercionFailed => {
                warn!(rule_id = %rule.id, %condition, "condition value failed type coercion");
                all_pass = false;
            }
        }
    }
    all_pass
}
