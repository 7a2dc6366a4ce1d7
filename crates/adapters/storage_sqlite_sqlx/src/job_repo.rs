//! `SQLite` implementation of [`ScheduledJobRepository`].
//!
//! The claim is a single conditional `UPDATE` checking `rows_affected`:
//! SQLite serializes writers, so exactly one of any number of racing
//! workers observes `status = 'pending'` and wins.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use wareflow_app::ports::ScheduledJobRepository;
use wareflow_domain::error::WareflowError;
use wareflow_domain::id::{JobId, RuleId, TenantId};
use wareflow_domain::job::{JobStatus, ScheduledJob};
use wareflow_domain::time::Timestamp;

use crate::error::StorageError;

struct Wrapper(ScheduledJob);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let rule_id: uuid::Uuid = row.try_get("rule_id")?;
        let tenant_id: uuid::Uuid = row.try_get("tenant_id")?;
        let scheduled_for: String = row.try_get("scheduled_for")?;
        let status: String = row.try_get("status")?;
        let error_message: Option<String> = row.try_get("error_message")?;
        let claimed_at: Option<String> = row.try_get("claimed_at")?;
        let created_at: String = row.try_get("created_at")?;

        let status: JobStatus =
            serde_json::from_value(serde_json::Value::String(status))
                .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(ScheduledJob {
            id: JobId::from_uuid(id),
            rule_id: RuleId::from_uuid(rule_id),
            tenant_id: TenantId::from_uuid(tenant_id),
            scheduled_for: parse_required(&scheduled_for)?,
            status,
            error_message,
            claimed_at: claimed_at.map(|s| parse_required(&s)).transpose()?,
            created_at: parse_required(&created_at)?,
        }))
    }
}

fn parse_required(value: &str) -> Result<Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.to_utc())
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

fn status_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Claimed => "claimed",
        JobStatus::Done => "done",
        JobStatus::Failed => "failed",
    }
}

/// `SQLite`-backed scheduled job repository.
#[derive(Clone)]
pub struct SqliteJobRepository {
    pool: SqlitePool,
}

impl SqliteJobRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ScheduledJobRepository for SqliteJobRepository {
    async fn upsert_next(&self, job: ScheduledJob) -> Result<ScheduledJob, WareflowError> {
        // Supersede any prior pending job in the same transaction so at
        // most one pending job exists per rule.
        let mut tx = self.pool.begin().await.map_err(StorageError::from)?;

        sqlx::query("DELETE FROM scheduled_jobs WHERE rule_id = ? AND status = 'pending'")
            .bind(job.rule_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;

        sqlx::query(
            "INSERT INTO scheduled_jobs (id, rule_id, tenant_id, scheduled_for, status, error_message, claimed_at, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(job.id.as_uuid())
        .bind(job.rule_id.as_uuid())
        .bind(job.tenant_id.as_uuid())
        .bind(job.scheduled_for.to_rfc3339())
        .bind(status_str(job.status))
        .bind(&job.error_message)
        .bind(job.claimed_at.map(|ts| ts.to_rfc3339()))
        .bind(job.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(StorageError::from)?;

        tx.commit().await.map_err(StorageError::from)?;
        Ok(job)
    }

    async fn find_due(
        &self,
        now: Timestamp,
        limit: u32,
    ) -> Result<Vec<ScheduledJob>, WareflowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(
            "SELECT * FROM scheduled_jobs WHERE status = 'pending' AND scheduled_for <= ? ORDER BY scheduled_for ASC LIMIT ?",
        )
        .bind(now.to_rfc3339())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn claim(&self, id: JobId, at: Timestamp) -> Result<bool, WareflowError> {
        let result = sqlx::query(
            "UPDATE scheduled_jobs SET status = 'claimed', claimed_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(at.to_rfc3339())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_done(&self, id: JobId, note: Option<String>) -> Result<(), WareflowError> {
        sqlx::query(
            "UPDATE scheduled_jobs SET status = 'done', error_message = ? WHERE id = ? AND status = 'claimed'",
        )
        .bind(&note)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }

    async fn mark_failed(&self, id: JobId, error: String) -> Result<(), WareflowError> {
        sqlx::query(
            "UPDATE scheduled_jobs SET status = 'failed', error_message = ? WHERE id = ? AND status = 'claimed'",
        )
        .bind(&error)
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }

    async fn release_expired(&self, cutoff: Timestamp) -> Result<u64, WareflowError> {
        let result = sqlx::query(
            "UPDATE scheduled_jobs SET status = 'pending', claimed_at = NULL WHERE status = 'claimed' AND claimed_at < ?",
        )
        .bind(cutoff.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(result.rows_affected())
    }

    async fn delete_for_rule(&self, rule_id: RuleId) -> Result<(), WareflowError> {
        sqlx::query("DELETE FROM scheduled_jobs WHERE rule_id = ?")
            .bind(rule_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn get_by_id(&self, id: JobId) -> Result<Option<ScheduledJob>, WareflowError> {
        let row: Option<Wrapper> = sqlx::query_as("SELECT * FROM scheduled_jobs WHERE id = ?")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use wareflow_app::ports::RuleRepository;
    use wareflow_domain::rule::{ActionConfig, ActionSpec, AutomationRule, Trigger};
    use wareflow_domain::time::now;

    use crate::pool::Config;
    use crate::rule_repo::SqliteRuleRepository;

    async fn setup() -> (SqliteJobRepository, AutomationRule) {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        let rules = SqliteRuleRepository::new(db.pool().clone());
        let rule = AutomationRule::builder()
            .tenant_id(TenantId::new())
            .name("Nightly")
            .trigger(Trigger::Schedule {
                cron: "0 0 * * *".to_string(),
                timezone: "UTC".to_string(),
            })
            .action(ActionSpec::inline(ActionConfig::SendNotification {
                recipient: "ops@example.com".to_string(),
                subject: "report".to_string(),
                body: String::new(),
            }))
            .build()
            .unwrap();
        let rule = rules.create(rule).await.unwrap();
        (SqliteJobRepository::new(db.pool().clone()), rule)
    }

    fn due_job(rule: &AutomationRule) -> ScheduledJob {
        ScheduledJob::pending(rule.id, rule.tenant_id, now() - Duration::seconds(1))
    }

    #[tokio::test]
    async fn should_insert_and_find_due_job() {
        let (repo, rule) = setup().await;
        let job = repo.upsert_next(due_job(&rule)).await.unwrap();

        let due = repo.find_due(now(), 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, job.id);
        assert_eq!(due[0].status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn should_not_find_future_jobs_as_due() {
        let (repo, rule) = setup().await;
        repo.upsert_next(ScheduledJob::pending(
            rule.id,
            rule.tenant_id,
            now() + Duration::hours(1),
        ))
        .await
        .unwrap();

        let due = repo.find_due(now(), 10).await.unwrap();
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn should_keep_at_most_one_pending_job_per_rule() {
        let (repo, rule) = setup().await;
        repo.upsert_next(due_job(&rule)).await.unwrap();
        let second = repo
            .upsert_next(ScheduledJob::pending(
                rule.id,
                rule.tenant_id,
                now() + Duration::hours(1),
            ))
            .await
            .unwrap();

        let pending = repo
            .find_due(now() + Duration::hours(2), 10)
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
    }

    #[tokio::test]
    async fn should_claim_pending_job_exactly_once() {
        let (repo, rule) = setup().await;
        let job = repo.upsert_next(due_job(&rule)).await.unwrap();

        assert!(repo.claim(job.id, now()).await.unwrap());
        assert!(!repo.claim(job.id, now()).await.unwrap());

        let claimed = repo.get_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(claimed.status, JobStatus::Claimed);
        assert!(claimed.claimed_at.is_some());
    }

    #[tokio::test]
    async fn should_let_exactly_one_concurrent_claim_win() {
        let (repo, rule) = setup().await;
        let job = repo.upsert_next(due_job(&rule)).await.unwrap();

        let (a, b) = tokio::join!(repo.claim(job.id, now()), repo.claim(job.id, now()));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a ^ b, "exactly one claim must win (a={a}, b={b})");
    }

    #[tokio::test]
    async fn should_mark_claimed_job_done_with_note() {
        let (repo, rule) = setup().await;
        let job = repo.upsert_next(due_job(&rule)).await.unwrap();
        repo.claim(job.id, now()).await.unwrap();

        repo.mark_done(job.id, Some("skipped: inactive".to_string()))
            .await
            .unwrap();

        let done = repo.get_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Done);
        assert_eq!(done.error_message.as_deref(), Some("skipped: inactive"));
    }

    #[tokio::test]
    async fn should_mark_claimed_job_failed_with_error() {
        let (repo, rule) = setup().await;
        let job = repo.upsert_next(due_job(&rule)).await.unwrap();
        repo.claim(job.id, now()).await.unwrap();

        repo.mark_failed(job.id, "webhook unreachable".to_string())
            .await
            .unwrap();

        let failed = repo.get_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("webhook unreachable"));
    }

    #[tokio::test]
    async fn should_release_only_claims_older_than_cutoff() {
        let (repo, rule) = setup().await;
        let stale = repo.upsert_next(due_job(&rule)).await.unwrap();
        repo.claim(stale.id, now() - Duration::minutes(10))
            .await
            .unwrap();

        let released = repo
            .release_expired(now() - Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(released, 1);

        let job = repo.get_by_id(stale.id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.claimed_at.is_none());

        // A fresh claim is untouched.
        repo.claim(stale.id, now()).await.unwrap();
        let released = repo
            .release_expired(now() - Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(released, 0);
    }

    #[tokio::test]
    async fn should_delete_jobs_for_rule() {
        let (repo, rule) = setup().await;
        repo.upsert_next(due_job(&rule)).await.unwrap();

        repo.delete_for_rule(rule.id).await.unwrap();

        let due = repo.find_due(now(), 10).await.unwrap();
        assert!(due.is_empty());
    }
}
