//! `SQLite` implementation of [`RuleRepository`].
//!
//! Trigger fields live in discrete columns so the dispatcher's
//! candidate query and the scheduler's due query stay indexable;
//! conditions and the action spec are JSON columns.

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use wareflow_app::ports::RuleRepository;
use wareflow_domain::error::WareflowError;
use wareflow_domain::event::EventKind;
use wareflow_domain::id::{RuleId, TenantId};
use wareflow_domain::rule::{ActionSpec, AutomationRule, Condition, Trigger};
use wareflow_domain::time::Timestamp;

use crate::error::StorageError;

struct Wrapper(AutomationRule);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<AutomationRule> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let tenant_id: uuid::Uuid = row.try_get("tenant_id")?;
        let name: String = row.try_get("name")?;
        let description: Option<String> = row.try_get("description")?;
        let trigger_type: String = row.try_get("trigger_type")?;
        let trigger_entity_type: Option<String> = row.try_get("trigger_entity_type")?;
        let trigger_event: Option<String> = row.try_get("trigger_event")?;
        let cron_expression: Option<String> = row.try_get("cron_expression")?;
        let timezone: Option<String> = row.try_get("timezone")?;
        let conditions_json: String = row.try_get("conditions")?;
        let action_json: String = row.try_get("action_data")?;
        let is_active: bool = row.try_get("is_active")?;
        let next_scheduled_str: Option<String> = row.try_get("next_scheduled_at")?;

        let trigger = decode_trigger(
            &trigger_type,
            trigger_entity_type,
            trigger_event,
            cron_expression,
            timezone,
        )?;
        let conditions: Vec<Condition> = serde_json::from_str(&conditions_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let action: ActionSpec = serde_json::from_str(&action_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let next_scheduled_at = parse_timestamp(next_scheduled_str)?;

        Ok(Self(AutomationRule {
            id: RuleId::from_uuid(id),
            tenant_id: TenantId::from_uuid(tenant_id),
            name,
            description,
            trigger,
            conditions,
            action,
            is_active,
            next_scheduled_at,
        }))
    }
}

fn decode_trigger(
    trigger_type: &str,
    entity_type: Option<String>,
    event: Option<String>,
    cron: Option<String>,
    timezone: Option<String>,
) -> Result<Trigger, sqlx::Error> {
    let missing = |column: &str| {
        sqlx::Error::Decode(format!("rule row missing `{column}` for `{trigger_type}`").into())
    };
    match trigger_type {
        "entity_event" => Ok(Trigger::EntityEvent {
            entity_type: entity_type.ok_or_else(|| missing("trigger_entity_type"))?,
            event: EventKind::from(event.ok_or_else(|| missing("trigger_event"))?),
        }),
        "schedule" => Ok(Trigger::Schedule {
            cron: cron.ok_or_else(|| missing("cron_expression"))?,
            timezone: timezone.ok_or_else(|| missing("timezone"))?,
        }),
        "manual" => Ok(Trigger::Manual),
        other => Err(sqlx::Error::Decode(
            format!("unknown trigger type `{other}`").into(),
        )),
    }
}

fn parse_timestamp(value: Option<String>) -> Result<Option<Timestamp>, sqlx::Error> {
    value
        .map(|s| {
            chrono::DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.to_utc())
                .map_err(|err| sqlx::Error::Decode(Box::new(err)))
        })
        .transpose()
}

type TriggerColumns = (
    &'static str,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn trigger_columns(trigger: &Trigger) -> TriggerColumns {
    match trigger {
        Trigger::EntityEvent { entity_type, event } => (
            "entity_event",
            Some(entity_type.clone()),
            Some(event.to_string()),
            None,
            None,
        ),
        Trigger::Schedule { cron, timezone } => (
            "schedule",
            None,
            None,
            Some(cron.clone()),
            Some(timezone.clone()),
        ),
        Trigger::Manual => ("manual", None, None, None, None),
    }
}

/// `SQLite`-backed rule repository.
#[derive(Clone)]
pub struct SqliteRuleRepository {
    pool: SqlitePool,
}

impl SqliteRuleRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl RuleRepository for SqliteRuleRepository {
    async fn create(&self, rule: AutomationRule) -> Result<AutomationRule, WareflowError> {
        let (trigger_type, entity_type, event, cron, timezone) = trigger_columns(&rule.trigger);
        let conditions_json =
            serde_json::to_string(&rule.conditions).map_err(StorageError::from)?;
        let action_json = serde_json::to_string(&rule.action).map_err(StorageError::from)?;
        let next_scheduled = rule.next_scheduled_at.map(|ts| ts.to_rfc3339());

        sqlx::query(
            "INSERT INTO automation_rules (id, tenant_id, name, description, trigger_type, trigger_entity_type, trigger_event, cron_expression, timezone, conditions, action_data, is_active, next_scheduled_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(rule.id.as_uuid())
        .bind(rule.tenant_id.as_uuid())
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(trigger_type)
        .bind(&entity_type)
        .bind(&event)
        .bind(&cron)
        .bind(&timezone)
        .bind(&conditions_json)
        .bind(&action_json)
        .bind(rule.is_active)
        .bind(&next_scheduled)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(rule)
    }

    async fn get_by_id(&self, id: RuleId) -> Result<Option<AutomationRule>, WareflowError> {
        let row: Option<Wrapper> = sqlx::query_as("SELECT * FROM automation_rules WHERE id = ?")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn get_all(&self, tenant_id: TenantId) -> Result<Vec<AutomationRule>, WareflowError> {
        let rows: Vec<Wrapper> =
            sqlx::query_as("SELECT * FROM automation_rules WHERE tenant_id = ? ORDER BY name")
                .bind(tenant_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn find_active_event_rules(
        &self,
        tenant_id: TenantId,
        entity_type: String,
        event: EventKind,
    ) -> Result<Vec<AutomationRule>, WareflowError> {
        let rows: Vec<Wrapper> = sqlx::query_as(
            "SELECT * FROM automation_rules WHERE tenant_id = ? AND trigger_type = 'entity_event' AND trigger_entity_type = ? AND trigger_event = ? AND is_active = 1 ORDER BY name",
        )
        .bind(tenant_id.as_uuid())
        .bind(&entity_type)
        .bind(event.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn update(&self, rule: AutomationRule) -> Result<AutomationRule, WareflowError> {
        let (trigger_type, entity_type, event, cron, timezone) = trigger_columns(&rule.trigger);
        let conditions_json =
            serde_json::to_string(&rule.conditions).map_err(StorageError::from)?;
        let action_json = serde_json::to_string(&rule.action).map_err(StorageError::from)?;
        let next_scheduled = rule.next_scheduled_at.map(|ts| ts.to_rfc3339());

        sqlx::query(
            "UPDATE automation_rules SET tenant_id = ?, name = ?, description = ?, trigger_type = ?, trigger_entity_type = ?, trigger_event = ?, cron_expression = ?, timezone = ?, conditions = ?, action_data = ?, is_active = ?, next_scheduled_at = ? WHERE id = ?",
        )
        .bind(rule.tenant_id.as_uuid())
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(trigger_type)
        .bind(&entity_type)
        .bind(&event)
        .bind(&cron)
        .bind(&timezone)
        .bind(&conditions_json)
        .bind(&action_json)
        .bind(rule.is_active)
        .bind(&next_scheduled)
        .bind(rule.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(rule)
    }

    async fn delete(&self, id: RuleId) -> Result<(), WareflowError> {
        sqlx::query("DELETE FROM automation_rules WHERE id = ?")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn set_next_scheduled(
        &self,
        id: RuleId,
        next: Option<Timestamp>,
    ) -> Result<(), WareflowError> {
        sqlx::query("UPDATE automation_rules SET next_scheduled_at = ? WHERE id = ?")
            .bind(next.map(|ts| ts.to_rfc3339()))
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Config;
    use wareflow_domain::rule::{ActionConfig, Operator, ValueType};

    async fn setup() -> SqliteRuleRepository {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
        }
        .build()
        .await
        .unwrap();
        SqliteRuleRepository::new(db.pool().clone())
    }

    fn notify_action() -> ActionSpec {
        ActionSpec::inline(ActionConfig::SendNotification {
            recipient: "ops@example.com".to_string(),
            subject: "Order update".to_string(),
            body: String::new(),
        })
    }

    fn event_rule(tenant: TenantId) -> AutomationRule {
        AutomationRule::builder()
            .tenant_id(tenant)
            .name("Cancelled orders")
            .trigger(Trigger::EntityEvent {
                entity_type: "SalesOrder".to_string(),
                event: EventKind::Other("status_changed".to_string()),
            })
            .condition(Condition::new(
                "new.status",
                Operator::Equals,
                "Cancelled",
                ValueType::String,
            ))
            .action(notify_action())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn should_create_and_retrieve_rule() {
        let repo = setup().await;
        let rule = event_rule(TenantId::new());
        let id = rule.id;

        repo.create(rule).await.unwrap();
        let fetched = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.name, "Cancelled orders");
        assert!(fetched.is_active);
        assert_eq!(fetched.conditions.len(), 1);
    }

    #[tokio::test]
    async fn should_return_none_when_rule_not_found() {
        let repo = setup().await;
        let result = repo.get_by_id(RuleId::new()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn should_preserve_trigger_through_roundtrip() {
        let repo = setup().await;
        let tenant = TenantId::new();

        let schedule = AutomationRule::builder()
            .tenant_id(tenant)
            .name("Nightly")
            .trigger(Trigger::Schedule {
                cron: "0 0 * * *".to_string(),
                timezone: "Europe/Amsterdam".to_string(),
            })
            .action(notify_action())
            .build()
            .unwrap();
        let id = schedule.id;
        repo.create(schedule).await.unwrap();

        let fetched = repo.get_by_id(id).await.unwrap().unwrap();
        assert!(matches!(
            fetched.trigger,
            Trigger::Schedule { cron, timezone }
                if cron == "0 0 * * *" && timezone == "Europe/Amsterdam"
        ));
    }

    #[tokio::test]
    async fn should_find_active_event_rules_by_trigger() {
        let repo = setup().await;
        let tenant = TenantId::new();
        repo.create(event_rule(tenant)).await.unwrap();

        let mut disabled = event_rule(tenant);
        disabled.name = "Disabled".to_string();
        disabled.is_active = false;
        repo.create(disabled).await.unwrap();

        let mut other_event = event_rule(tenant);
        other_event.name = "Created watcher".to_string();
        other_event.trigger = Trigger::EntityEvent {
            entity_type: "SalesOrder".to_string(),
            event: EventKind::Created,
        };
        repo.create(other_event).await.unwrap();

        let matches = repo
            .find_active_event_rules(
                tenant,
                "SalesOrder".to_string(),
                EventKind::Other("status_changed".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "Cancelled orders");
    }

    #[tokio::test]
    async fn should_scope_event_rule_query_to_tenant() {
        let repo = setup().await;
        repo.create(event_rule(TenantId::new())).await.unwrap();

        let matches = repo
            .find_active_event_rules(
                TenantId::new(),
                "SalesOrder".to_string(),
                EventKind::Other("status_changed".to_string()),
            )
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn should_update_rule() {
        let repo = setup().await;
        let rule = event_rule(TenantId::new());
        let id = rule.id;
        repo.create(rule).await.unwrap();

        let mut fetched = repo.get_by_id(id).await.unwrap().unwrap();
        fetched.name = "Renamed".to_string();
        fetched.is_active = false;
        repo.update(fetched).await.unwrap();

        let updated = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(updated.name, "Renamed");
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn should_set_and_clear_next_scheduled() {
        let repo = setup().await;
        let rule = event_rule(TenantId::new());
        let id = rule.id;
        repo.create(rule).await.unwrap();

        let next = wareflow_domain::time::now();
        repo.set_next_scheduled(id, Some(next)).await.unwrap();
        let fetched = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(fetched.next_scheduled_at, Some(next));

        repo.set_next_scheduled(id, None).await.unwrap();
        let fetched = repo.get_by_id(id).await.unwrap().unwrap();
        assert!(fetched.next_scheduled_at.is_none());
    }

    #[tokio::test]
    async fn should_delete_rule() {
        let repo = setup().await;
        let rule = event_rule(TenantId::new());
        let id = rule.id;
        repo.create(rule).await.unwrap();

        repo.delete(id).await.unwrap();
        assert!(repo.get_by_id(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_list_rules_per_tenant() {
        let repo = setup().await;
        let tenant = TenantId::new();
        repo.create(event_rule(tenant)).await.unwrap();
        let mut second = event_rule(tenant);
        second.name = "Another".to_string();
        repo.create(second).await.unwrap();
        repo.create(event_rule(TenantId::new())).await.unwrap();

        let all = repo.get_all(tenant).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
