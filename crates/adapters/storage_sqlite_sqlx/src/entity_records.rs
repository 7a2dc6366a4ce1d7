//! `SQLite` implementation of [`EntityCommands`] over a generic records
//! table.
//!
//! Production deployments register their own [`EntityCommands`] adapters
//! pointing at the real CRUD modules; this one gives the standalone
//! daemon (and integration tests) a working create/update target without
//! the engine learning any module's schema.

use std::collections::BTreeMap;

use sqlx::{Row, SqlitePool};

use wareflow_app::ports::EntityCommands;
use wareflow_domain::error::{NotFoundError, WareflowError};
use wareflow_domain::id::TenantId;
use wareflow_domain::rule::EntityRef;
use wareflow_domain::time;

use crate::error::StorageError;

/// Generic records adapter for action side effects.
#[derive(Clone)]
pub struct SqliteEntityCommands {
    pool: SqlitePool,
}

impl SqliteEntityCommands {
    /// Create a new adapter backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch a record's data for inspection (operator tooling and tests).
    ///
    /// # Errors
    ///
    /// Returns a storage error, or `Ok(None)` when the record is missing.
    pub async fn get_record(
        &self,
        entity_ref: &EntityRef,
    ) -> Result<Option<serde_json::Value>, WareflowError> {
        let id = entity_ref
            .entity_id
            .parse::<uuid::Uuid>()
            .map_err(|err| WareflowError::Storage(Box::new(err)))?;
        let row = sqlx::query("SELECT data FROM entity_records WHERE id = ? AND entity_type = ?")
            .bind(id)
            .bind(&entity_ref.entity_type)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        row.map(|row| {
            let data: String = row.try_get("data").map_err(StorageError::from)?;
            serde_json::from_str(&data).map_err(|err| StorageError::from(err).into())
        })
        .transpose()
    }
}

impl EntityCommands for SqliteEntityCommands {
    async fn create_record(
        &self,
        tenant_id: TenantId,
        entity_type: String,
        fields: BTreeMap<String, serde_json::Value>,
    ) -> Result<EntityRef, WareflowError> {
        let id = uuid::Uuid::new_v4();
        let data = serde_json::to_string(&fields).map_err(StorageError::from)?;
        let now = time::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO entity_records (id, tenant_id, entity_type, data, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(tenant_id.as_uuid())
        .bind(&entity_type)
        .bind(&data)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(EntityRef {
            entity_type,
            entity_id: id.to_string(),
        })
    }

    async fn update_field(
        &self,
        tenant_id: TenantId,
        entity_type: String,
        entity_id: String,
        field: String,
        value: serde_json::Value,
    ) -> Result<(), WareflowError> {
        let id = entity_id
            .parse::<uuid::Uuid>()
            .map_err(|err| WareflowError::Storage(Box::new(err)))?;

        let result = sqlx::query(
            "UPDATE entity_records SET data = json_set(data, '$.' || ?, json(?)), updated_at = ? WHERE id = ? AND tenant_id = ? AND entity_type = ?",
        )
        .bind(&field)
        .bind(serde_json::to_string(&value).map_err(StorageError::from)?)
        .bind(time::now().to_rfc3339())
        .bind(id)
        .bind(tenant_id.as_uuid())
        .bind(&entity_type)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(NotFoundError {
                entity: "EntityRecord",
                id: entity_id,
            }
            .into());
        }
        Ok(())
    }
}
