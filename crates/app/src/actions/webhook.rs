//! Handler for `invoke_webhook` actions, with bounded retries.
//!
//! Transient transport failures and 5xx responses are retried with
//! exponential backoff; 4xx responses and permanent transport failures
//! are not. The per-attempt deadline lives in the webhook client; the
//! whole handler additionally runs under the runner's action timeout.

use std::time::Duration;

use tracing::warn;

use wareflow_domain::error::ActionError;
use wareflow_domain::rule::{ActionConfig, ActionOutput};

use crate::actions::misrouted;
use crate::ports::{WebhookClient, WebhookRequest};
use crate::registry::{ActionContext, ActionHandler};

/// Delivers webhook calls through the [`WebhookClient`] port.
pub struct WebhookHandler<W> {
    client: W,
    max_retries: u32,
    backoff_base: Duration,
}

impl<W> WebhookHandler<W> {
    /// `max_retries` counts retries *after* the first attempt.
    pub fn new(client: W, max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            client,
            max_retries,
            backoff_base,
        }
    }

    fn backoff(&self, retry: u32) -> Duration {
        self.backoff_base.saturating_mul(2_u32.saturating_pow(retry))
    }
}

#[async_trait::async_trait]
impl<W> ActionHandler for WebhookHandler<W>
where
    W: WebhookClient + Send + Sync,
{
    async fn execute(
        &self,
        config: &ActionConfig,
        ctx: &ActionContext,
    ) -> Result<ActionOutput, ActionError> {
        let ActionConfig::InvokeWebhook {
            url,
            headers,
            payload,
        } = config
        else {
            return Err(misrouted(config));
        };

        let request = WebhookRequest {
            url: url.clone(),
            headers: headers.clone(),
            payload: payload.clone(),
        };

        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.backoff(attempt - 1)).await;
            }
            match self.client.post(request.clone()).await {
                Ok(response) if response.is_success() => {
                    return Ok(ActionOutput::with_data(serde_json::json!({
                        "url": url,
                        "status": response.status,
                        "attempts": attempt + 1,
                    })));
                }
                Ok(response) if response.is_server_error() => {
                    last_error = format!("HTTP {}", response.status);
                    warn!(rule_id = %ctx.rule_id, %url, status = response.status, attempt, "webhook attempt failed");
                }
                Ok(response) => {
                    // 4xx: retrying cannot help.
                    return Err(ActionError::Handler(format!(
                        "webhook to {url} rejected with HTTP {}",
                        response.status
                    )));
                }
                Err(err) if err.is_retryable() => {
                    last_error = err.to_string();
                    warn!(rule_id = %ctx.rule_id, %url, error = %err, attempt, "webhook attempt failed");
                }
                Err(err) => {
                    return Err(ActionError::Handler(format!(
                        "webhook to {url} failed permanently: {err}"
                    )));
                }
            }
        }
        Err(ActionError::Handler(format!(
            "webhook to {url} failed after {} attempts: {last_error}",
            self.max_retries + 1
        )))
    }
}
