//! `SQLite` implementation of [`ExecutionStore`].
//!
//! Updates guard on non-terminal status in the `WHERE` clause, mirroring
//! the recorder's append-only contract at the storage layer: a terminal
//! row is never overwritten even by a buggy caller.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use wareflow_app::ports::ExecutionStore;
use wareflow_domain::error::WareflowError;
use wareflow_domain::execution::{ExecutionStatus, RuleExecution};
use wareflow_domain::id::{ExecutionId, RuleId, TenantId};
use wareflow_domain::rule::EntityRef;
use wareflow_domain::snapshot::Snapshot;

use crate::error::StorageError;

struct Wrapper(RuleExecution);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let rule_id: uuid::Uuid = row.try_get("rule_id")?;
        let tenant_id: uuid::Uuid = row.try_get("tenant_id")?;
        let status: String = row.try_get("status")?;
        let fired_by: String = row.try_get("fired_by")?;
        let trigger_entity_type: Option<String> = row.try_get("trigger_entity_type")?;
        let snapshot_json: String = row.try_get("snapshot")?;
        let result_json: Option<String> = row.try_get("result_data")?;
        let error_message: Option<String> = row.try_get("error_message")?;
        let created_entity_type: Option<String> = row.try_get("created_entity_type")?;
        let created_entity_id: Option<String> = row.try_get("created_entity_id")?;
        let created_at: String = row.try_get("created_at")?;
        let started_at: Option<String> = row.try_get("started_at")?;
        let completed_at: Option<String> = row.try_get("completed_at")?;

        let status = decode_enum(&status)?;
        let fired_by = decode_enum(&fired_by)?;
        let snapshot: Snapshot = serde_json::from_str(&snapshot_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let result_data = result_json
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?
            .unwrap_or(serde_json::Value::Null);
        let created_entity = match (created_entity_type, created_entity_id) {
            (Some(entity_type), Some(entity_id)) => Some(EntityRef {
                entity_type,
                entity_id,
            }),
            _ => None,
        };

        Ok(Self(RuleExecution {
            id: ExecutionId::from_uuid(id),
            rule_id: RuleId::from_uuid(rule_id),
            tenant_id: TenantId::from_uuid(tenant_id),
            status,
            fired_by,
            trigger_entity_type,
            snapshot,
            result_data,
            error_message,
            created_entity,
            created_at: parse_required(&created_at)?,
            started_at: parse_optional(started_at)?,
            completed_at: parse_optional(completed_at)?,
        }))
    }
}

fn decode_enum<T: serde::de::DeserializeOwned>(value: &str) -> Result<T, sqlx::Error> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

fn encode_enum<T: serde::Serialize>(value: &T) -> Result<String, StorageError> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

fn parse_required(value: &str) -> Result<wareflow_domain::time::Timestamp, sqlx::Error> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.to_utc())
        .map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

fn parse_optional(
    value: Option<String>,
) -> Result<Option<wareflow_domain::time::Timestamp>, sqlx::Error> {
    value.map(|s| parse_required(&s)).transpose()
}

/// `SQLite`-backed execution store.
#[derive(Clone)]
pub struct SqliteExecutionStore {
    pool: SqlitePool,
}

impl SqliteExecutionStore {
    /// Create a new store backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ExecutionStore for SqliteExecutionStore {
    async fn insert(&self, execution: RuleExecution) -> Result<(), WareflowError> {
        let snapshot_json =
            serde_json::to_string(&execution.snapshot).map_err(StorageError::from)?;
        let result_json =
            serde_json::to_string(&execution.result_data).map_err(StorageError::from)?;

        sqlx::query(
            "INSERT INTO rule_executions (id, rule_id, tenant_id, status, fired_by, trigger_entity_type, snapshot, result_data, error_message, created_entity_type, created_entity_id, created_at, started_at, completed_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(execution.id.as_uuid())
        .bind(execution.rule_id.as_uuid())
        .bind(execution.tenant_id.as_uuid())
        .bind(encode_enum(&execution.status)?)
        .bind(encode_enum(&execution.fired_by)?)
        .bind(&execution.trigger_entity_type)
        .bind(&snapshot_json)
        .bind(&result_json)
        .bind(&execution.error_message)
        .bind(execution.created_entity.as_ref().map(|e| e.entity_type.clone()))
        .bind(execution.created_entity.as_ref().map(|e| e.entity_id.clone()))
        .bind(execution.created_at.to_rfc3339())
        .bind(execution.started_at.map(|ts| ts.to_rfc3339()))
        .bind(execution.completed_at.map(|ts| ts.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }

    async fn update(&self, execution: RuleExecution) -> Result<(), WareflowError> {
        let result_json =
            serde_json::to_string(&execution.result_data).map_err(StorageError::from)?;

        sqlx::query(
            "UPDATE rule_executions SET status = ?, result_data = ?, error_message = ?, created_entity_type = ?, created_entity_id = ?, started_at = ?, completed_at = ? WHERE id = ? AND status IN ('pending', 'running')",
        )
        .bind(encode_enum(&execution.status)?)
        .bind(&result_json)
        .bind(&execution.error_message)
        .bind(execution.created_entity.as_ref().map(|e| e.entity_type.clone()))
        .bind(execution.created_entity.as_ref().map(|e| e.entity_id.clone()))
        .bind(execution.started_at.map(|ts| ts.to_rfc3339()))
        .bind(execution.completed_at.map(|ts| ts.to_rfc3339()))
        .bind(execution.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }

    async fn get_by_id(&self, id: ExecutionId) -> Result<Option<RuleExecution>, WareflowError> {
        let row: Option<Wrapper> = sqlx::query_as("SELECT * FROM rule_executions WHERE id = ?")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn find_by_rule(&self, rule_id: RuleId) -> Result<Vec<RuleExecution>, WareflowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(
            "SELECT * FROM rule_executions WHERE rule_id = ? ORDER BY created_at DESC",
        )
        .bind(rule_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn find_by_status(
        &self,
        tenant_id: TenantId,
        status: ExecutionStatus,
    ) -> Result<Vec<RuleExecution>, WareflowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(
            "SELECT * FROM rule_executions WHERE tenant_id = ? AND status = ? ORDER BY created_at DESC",
        )
        .bind(tenant_id.as_uuid())
        .bind(encode_enum(&status)?)
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
