//! Scheduler loop — the time-driven path.
//!
//! A periodic poll claims due jobs, re-validates the rule at claim time,
//! executes the action with a schedule snapshot, and always queues the
//! next occurrence — a single failed run never stalls a recurring rule.
//!
//! Multiple process instances may run this loop concurrently: correctness
//! rests entirely on the store's atomic claim. A janitor pass at the start
//! of every tick returns jobs whose worker died mid-run (claimed longer
//! than the lease) to pending, giving at-least-once execution.

use std::sync::Arc;

use tracing::{error, info, warn};

use wareflow_domain::error::WareflowError;
use wareflow_domain::execution::{ExecutionStatus, FiredBy};
use wareflow_domain::job::ScheduledJob;
use wareflow_domain::rule::AutomationRule;
use wareflow_domain::snapshot::Snapshot;
use wareflow_domain::time::{self, Timestamp};

use crate::config::EngineConfig;
use crate::ports::{ExecutionStore, RuleRepository, ScheduledJobRepository, TemplateRepository};
use crate::runner::RuleRunner;

/// What one scheduler tick did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Jobs whose expired claims the janitor returned to pending.
    pub released: u64,
    /// Jobs this instance won the claim for.
    pub claimed: usize,
    /// Claimed jobs that ran to a non-failed execution (or were skipped
    /// because the rule was disabled or deleted).
    pub completed: usize,
    /// Claimed jobs whose execution failed.
    pub failed: usize,
}

/// Polls for due scheduled jobs and runs them.
pub struct SchedulerLoop<R, X, T, J> {
    runner: Arc<RuleRunner<R, X, T>>,
    jobs: J,
    config: EngineConfig,
}

impl<R, X, T, J> SchedulerLoop<R, X, T, J>
where
    R: RuleRepository + Send + Sync,
    X: ExecutionStore + Send + Sync,
    T: TemplateRepository + Send + Sync,
    J: ScheduledJobRepository + Send + Sync,
{
    /// Create a scheduler loop around a shared runner and job store.
    pub fn new(runner: Arc<RuleRunner<R, X, T>>, jobs: J, config: EngineConfig) -> Self {
        Self {
            runner,
            jobs,
            config,
        }
    }

    /// Run forever, ticking every `poll_interval`.
    ///
    /// Tick errors are infrastructure failures (store unavailable); they
    /// are logged and the next tick retries naturally.
    pub async fn run(&self) {
        info!(interval = ?self.config.poll_interval, "scheduler loop started");
        loop {
            if let Err(err) = self.tick(time::now()).await {
                error!(error = %err, "scheduler tick failed");
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// One poll cycle: janitor, claim, execute, reschedule.
    ///
    /// # Errors
    ///
    /// Returns storage errors; per-job action failures are captured in the
    /// job and execution records instead.
    pub async fn tick(&self, now: Timestamp) -> Result<TickReport, WareflowError> {
        let mut report = TickReport::default();

        let cutoff = now - self.config.claim_lease_chrono();
        report.released = self.jobs.release_expired(cutoff).await?;
        if report.released > 0 {
            warn!(
                released = report.released,
                "janitor returned expired claims to pending"
            );
        }

        let due = self.jobs.find_due(now, self.config.due_batch_size).await?;
        for job in due {
            // Losing the claim is the normal multi-instance case: another
            // worker owns the job.
            if !self.jobs.claim(job.id, now).await? {
                continue;
            }
            report.claimed += 1;
            self.run_claimed(&job, now, &mut report).await?;
        }
        Ok(report)
    }

    async fn run_claimed(
        &self,
        job: &ScheduledJob,
        now: Timestamp,
        report: &mut TickReport,
    ) -> Result<(), WareflowError> {
        // Re-fetch the rule at claim time: edits and disables made after
        // the job was queued must take effect on this very occurrence.
        let Some(rule) = self.runner.rules().get_by_id(job.rule_id).await? else {
            self.jobs
                .mark_done(job.id, Some("skipped: rule deleted".to_string()))
                .await?;
            report.completed += 1;
            return Ok(());
        };

        if !rule.is_active {
            info!(rule_id = %rule.id, job_id = %job.id, "skipping job for inactive rule");
            self.jobs
                .mark_done(job.id, Some("skipped: inactive".to_string()))
                .await?;
            self.runner.rules().set_next_scheduled(rule.id, None).await?;
            report.completed += 1;
            return Ok(());
        }

        let snapshot = schedule_snapshot(&rule, job.scheduled_for, now);
        let execution = self
            .runner
            .run_rule(&rule, snapshot, FiredBy::Schedule, None)
            .await?;

        if execution.status == ExecutionStatus::Failed {
            let error = execution
                .error_message
                .unwrap_or_else(|| "action failed".to_string());
            self.jobs.mark_failed(job.id, error).await?;
            report.failed += 1;
        } else {
            self.jobs.mark_done(job.id, None).await?;
            report.completed += 1;
        }

        self.queue_next_occurrence(&rule, now).await
    }

    /// Compute and queue the next occurrence. Runs after success *and*
    /// failure so the recurring schedule keeps advancing.
    async fn queue_next_occurrence(
        &self,
        rule: &AutomationRule,
        now: Timestamp,
    ) -> Result<(), WareflowError> {
        let Some(schedule) = rule.trigger.schedule() else {
            return Ok(());
        };
        match schedule.next_fire_time(now) {
            Ok(next) => {
                self.jobs
                    .upsert_next(ScheduledJob::pending(rule.id, rule.tenant_id, next))
                    .await?;
                self.runner
                    .rules()
                    .set_next_scheduled(rule.id, Some(next))
                    .await?;
            }
            Err(err) => {
                // Expressions are validated at save time; reaching this
                // means a corrupted record. Surface it loudly but do not
                // poison the rest of the tick.
                error!(rule_id = %rule.id, error = %err, "stored schedule cannot compute next occurrence");
            }
        }
        Ok(())
    }
}

/// Schedule triggers have no entity context: the snapshot carries rule
/// metadata and the fire times instead.
fn schedule_snapshot(rule: &AutomationRule, scheduled_for: Timestamp, now: Timestamp) -> Snapshot {
    Snapshot::from_json(serde_json::json!({
        "rule": {
            "id": rule.id,
            "name": rule.name,
        },
        "scheduled_for": scheduled_for.to_rfc3339(),
        "fired_at": now.to_rfc3339(),
    }))
}
