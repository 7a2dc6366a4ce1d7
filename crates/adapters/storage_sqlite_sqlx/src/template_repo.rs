//! `SQLite` implementation of [`TemplateRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use wareflow_app::ports::TemplateRepository;
use wareflow_domain::error::WareflowError;
use wareflow_domain::id::{TemplateId, TenantId};
use wareflow_domain::template::ActionTemplate;

use crate::error::StorageError;

struct Wrapper(ActionTemplate);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let tenant_id: uuid::Uuid = row.try_get("tenant_id")?;
        let code: String = row.try_get("code")?;
        let description: Option<String> = row.try_get("description")?;
        let config_json: String = row.try_get("config")?;

        let config = serde_json::from_str(&config_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(ActionTemplate {
            id: TemplateId::from_uuid(id),
            tenant_id: TenantId::from_uuid(tenant_id),
            code,
            description,
            config,
        }))
    }
}

/// `SQLite`-backed template repository.
///
/// The `(tenant_id, code)` unique index backs the service-level
/// uniqueness check.
#[derive(Clone)]
pub struct SqliteTemplateRepository {
    pool: SqlitePool,
}

impl SqliteTemplateRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TemplateRepository for SqliteTemplateRepository {
    async fn create(&self, template: ActionTemplate) -> Result<ActionTemplate, WareflowError> {
        let config_json = serde_json::to_string(&template.config).map_err(StorageError::from)?;

        sqlx::query(
            "INSERT INTO action_templates (id, tenant_id, code, description, config) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(template.id.as_uuid())
        .bind(template.tenant_id.as_uuid())
        .bind(&template.code)
        .bind(&template.description)
        .bind(&config_json)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(template)
    }

    async fn get_by_id(&self, id: TemplateId) -> Result<Option<ActionTemplate>, WareflowError> {
        let row: Option<Wrapper> = sqlx::query_as("SELECT * FROM action_templates WHERE id = ?")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn find_by_code(
        &self,
        tenant_id: TenantId,
        code: String,
    ) -> Result<Option<ActionTemplate>, WareflowError> {
        let row: Option<Wrapper> =
            sqlx::query_as("SELECT * FROM action_templates WHERE tenant_id = ? AND code = ?")
                .bind(tenant_id.as_uuid())
                .bind(&code)
                .fetch_optional(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn get_all(&self, tenant_id: TenantId) -> Result<Vec<ActionTemplate>, WareflowError> {
        let rows: Vec<Wrapper> =
            sqlx::query_as("SELECT * FROM action_templates WHERE tenant_id = ? ORDER BY code")
                .bind(tenant_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn update(&self, template: ActionTemplate) -> Result<ActionTemplate, WareflowError> {
        let config_json = serde_json::to_string(&template.config).map_err(StorageError::from)?;

        sqlx::query(
            "UPDATE action_templates SET code = ?, description = ?, config = ? WHERE id = ?",
        )
        .bind(&template.code)
        .bind(&template.description)
        .bind(&config_json)
        .bind(template.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(template)
    }

    async fn delete(&self, id: TemplateId) -> Result<(), WareflowError> {
        sqlx::query("DELETE FROM action_templates WHERE id = ?")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
