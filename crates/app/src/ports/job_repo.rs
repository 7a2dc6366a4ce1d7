//! Scheduled job repository port — durable jobs with atomic claiming.

use std::future::Future;

use wareflow_domain::error::WareflowError;
use wareflow_domain::id::{JobId, RuleId};
use wareflow_domain::job::ScheduledJob;
use wareflow_domain::time::Timestamp;

/// Repository for durable [`ScheduledJob`] markers.
///
/// [`ScheduledJobRepository::claim`] is the only place the engine needs
/// true concurrency control: it must be an atomic compare-and-set so that
/// exactly one of several racing workers wins a job.
pub trait ScheduledJobRepository {
    /// Insert the next pending job for a rule, superseding (deleting) any
    /// prior pending job so at most one exists per rule.
    fn upsert_next(
        &self,
        job: ScheduledJob,
    ) -> impl Future<Output = Result<ScheduledJob, WareflowError>> + Send;

    /// Pending jobs whose `scheduled_for` has passed, oldest first.
    fn find_due(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<ScheduledJob>, WareflowError>> + Send;

    /// Atomically claim a pending job (`Pending → Claimed`).
    ///
    /// Returns `false` when another worker already claimed it — an
    /// expected, normal outcome for the losing worker.
    fn claim(
        &self,
        id: JobId,
        at: Timestamp,
    ) -> impl Future<Output = Result<bool, WareflowError>> + Send;

    /// Mark a claimed job done, optionally with a note (e.g.
    /// `"skipped: inactive"`).
    fn mark_done(
        &self,
        id: JobId,
        note: Option<String>,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send;

    /// Mark a claimed job failed with an error message.
    fn mark_failed(
        &self,
        id: JobId,
        error: String,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send;

    /// Janitor pass: return jobs claimed before `cutoff` to pending so a
    /// live worker can re-claim them. Returns how many were released.
    fn release_expired(
        &self,
        cutoff: Timestamp,
    ) -> impl Future<Output = Result<u64, WareflowError>> + Send;

    /// Delete all jobs for a rule (rule disabled or deleted).
    fn delete_for_rule(
        &self,
        rule_id: RuleId,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send;

    /// Fetch a job by id.
    fn get_by_id(
        &self,
        id: JobId,
    ) -> impl Future<Output = Result<Option<ScheduledJob>, WareflowError>> + Send;
}

impl<T: ScheduledJobRepository + Send + Sync> ScheduledJobRepository for std::sync::Arc<T> {
    fn upsert_next(
        &self,
        job: ScheduledJob,
    ) -> impl Future<Output = Result<ScheduledJob, WareflowError>> + Send {
        (**self).upsert_next(job)
    }

    fn find_due(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<ScheduledJob>, WareflowError>> + Send {
        (**self).find_due(now, limit)
    }

    fn claim(
        &self,
        id: JobId,
        at: Timestamp,
    ) -> impl Future<Output = Result<bool, WareflowError>> + Send {
        (**self).claim(id, at)
    }

    fn mark_done(
        &self,
        id: JobId,
        note: Option<String>,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        (**self).mark_done(id, note)
    }

    fn mark_failed(
        &self,
        id: JobId,
        error: String,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        (**self).mark_failed(id, error)
    }

    fn release_expired(
        &self,
        cutoff: Timestamp,
    ) -> impl Future<Output = Result<u64, WareflowError>> + Send {
        (**self).release_expired(cutoff)
    }

    fn delete_for_rule(
        &self,
        rule_id: RuleId,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        (**self).delete_for_rule(rule_id)
    }

    fn get_by_id(
        &self,
        id: JobId,
    ) -> impl Future<Output = Result<Option<ScheduledJob>, WareflowError>> + Send {
        (**self).get_by_id(id)
    }
}
