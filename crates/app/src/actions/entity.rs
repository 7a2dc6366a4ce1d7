//! Handlers for `create_entity` and `update_entity_field` actions.

use wareflow_domain::error::ActionError;
use wareflow_domain::rule::{ActionConfig, ActionOutput};

use crate::actions::misrouted;
use crate::ports::EntityCommands;
use crate::registry::{ActionContext, ActionHandler};

/// Creates a record in another module through the [`EntityCommands`] port.
pub struct CreateEntityHandler<E> {
    entities: E,
}

impl<E> CreateEntityHandler<E> {
    pub fn new(entities: E) -> Self {
        Self { entities }
    }
}

#[async_trait::async_trait]
impl<E> ActionHandler for CreateEntityHandler<E>
where
    E: EntityCommands + Send + Sync,
{
    async fn execute(
        &self,
        config: &ActionConfig,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, ActionError> {
        let ActionConfig::CreateEntity {
            entity_type,
            fields,
        } = config
        else {
            return Err(misrouted(config));
        };
        let created = self
            .entities
            .create_record(ctx.tenant_id, entity_type.clone(), fields.clone())
            .await
            .map_err(|err| ActionError::Handler(err.to_string()))?;
        Ok(ActionOutput::created(created))
    }
}

/// Sets one field on an existing record through the [`EntityCommands`] port.
pub struct UpdateEntityFieldHandler<E> {
    entities: E,
}

impl<E> UpdateEntityFieldHandler<E> {
    pub fn new(entities: E) -> Self {
        Self { entities }
    }
}

#[async_trait::async_trait]
impl<E> ActionHandler for UpdateEntityFieldHandler<E>
where
    E: EntityCommands + Send + Sync,
{
    async fn execute(
        &self,
        config: &ActionConfig,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, ActionError> {
        let ActionConfig::UpdateEntityField {
            entity_type,
            entity_id,
            field,
            value,
        } = config
        else {
            return Err(misrouted(config));
        };
        self.entities
            .update_field(
                ctx.tenant_id,
                entity_type.clone(),
                entity_id.clone(),
                field.clone(),
                value.clone(),
            )
            .await
            .map_err(|err| ActionError::Handler(err.to_string()))?;
        Ok(ActionOutput::with_data(serde_json::json!({
            "updated_entity_type": entity_type,
            "updated_entity_id": entity_id,
            "field": field,
        })))
    }
}
