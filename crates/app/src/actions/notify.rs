//! Handler for `send_notification` actions.

use wareflow_domain::error::ActionError;
use wareflow_domain::rule::{ActionConfig, ActionOutput};

use crate::actions::misrouted;
use crate::ports::{Notification, Notifier};
use crate::registry::{ActionContext, ActionHandler};

/// Delivers notifications through the [`Notifier`] port.
pub struct NotificationHandler<N> {
    notifier: N,
}

impl<N> NotificationHandler<N> {
    pub fn new(notifier: N) -> Self {
        Self { notifier }
    }
}

#[async_trait::async_trait]
impl<N> ActionHandler for NotificationHandler<N>
where
    N: Notifier + Send + Sync,
{
    async fn execute(
        &self,
        config: &ActionConfig,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, ActionError> {
        let ActionConfig::SendNotification {
            recipient,
            subject,
            body,
        } = config
        else {
            return Err(misrouted(config));
        };
        self.notifier
            .notify(Notification {
                tenant_id: ctx.tenant_id,
                recipient: recipient.clone(),
                subject: subject.clone(),
                body: body.clone(),
            })
            .await
            .map_err(|err| ActionError::Handler(err.to_string()))?;
        Ok(ActionOutput::with_data(serde_json::json!({
            "notified": recipient,
        })))
    }
}
