//! Integration ports — the side effects actions can perform.
//!
//! Surrounding modules implement these and register the corresponding
//! handlers; the engine itself stays schema-agnostic.

use std::collections::BTreeMap;
use std::future::Future;

use wareflow_domain::error::WareflowError;
use wareflow_domain::id::TenantId;
use wareflow_domain::rule::EntityRef;

/// Create and mutate records in other modules on behalf of actions.
pub trait EntityCommands {
    /// Create a record of `entity_type` with the given field values and
    /// return a durable pointer to it.
    fn create_record(
        &self,
        tenant_id: TenantId,
        entity_type: String,
        fields: BTreeMap<String, serde_json::Value>,
    ) -> impl Future<Output = Result<EntityRef, WareflowError>> + Send;

    /// Set one field on an existing record.
    fn update_field(
        &self,
        tenant_id: TenantId,
        entity_type: String,
        entity_id: String,
        field: String,
        value: serde_json::Value,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send;
}

impl<T: EntityCommands + Send + Sync> EntityCommands for std::sync::Arc<T> {
    fn create_record(
        &self,
        tenant_id: TenantId,
        entity_type: String,
        fields: BTreeMap<String, serde_json::Value>,
    ) -> impl Future<Output = Result<EntityRef, WareflowError>> + Send {
        (**self).create_record(tenant_id, entity_type, fields)
    }

    fn update_field(
        &self,
        tenant_id: TenantId,
        entity_type: String,
        entity_id: String,
        field: String,
        value: serde_json::Value,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        (**self).update_field(tenant_id, entity_type, entity_id, field, value)
    }
}

/// A notification to deliver through whatever channel the host configures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub tenant_id: TenantId,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Deliver notifications produced by `send_notification` actions.
pub trait Notifier {
    /// Deliver one notification.
    fn notify(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send;
}

impl<T: Notifier + Send + Sync> Notifier for std::sync::Arc<T> {
    fn notify(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        (**self).notify(notification)
    }
}

/// One webhook delivery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub payload: serde_json::Value,
}

/// The HTTP response to a webhook delivery, reduced to what retry logic
/// needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
}

impl WebhookResponse {
    /// 2xx response.
    #[must_use]
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 5xx response — worth retrying.
    #[must_use]
    pub fn is_server_error(self) -> bool {
        self.status >= 500
    }
}

/// Transport-level webhook failures, split by retryability.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WebhookDeliveryError {
    /// The request did not complete within its deadline.
    #[error("webhook request timed out")]
    Timeout,

    /// A failure that may resolve on retry (connect refused, DNS, reset).
    #[error("transient webhook failure: {0}")]
    Transient(String),

    /// A failure retrying cannot fix (invalid URL, TLS misconfiguration).
    #[error("permanent webhook failure: {0}")]
    Permanent(String),
}

impl WebhookDeliveryError {
    /// Whether a retry could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transient(_))
    }
}

/// Deliver a single webhook request. Retry policy lives in the handler,
/// not here: one call is one attempt.
pub trait WebhookClient {
    /// POST the request's JSON payload to its URL.
    fn post(
        &self,
        request: WebhookRequest,
    ) -> impl Future<Output = Result<WebhookResponse, WebhookDeliveryError>> + Send;
}

impl<T: WebhookClient + Send + Sync> WebhookClient for std::sync::Arc<T> {
    fn post(
        &self,
        request: WebhookRequest,
    ) -> impl Future<Output = Result<WebhookResponse, WebhookDeliveryError>> + Send {
        (**self).post(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_classify_response_status_ranges() {
        assert!(WebhookResponse { status: 204 }.is_success());
        assert!(!WebhookResponse { status: 404 }.is_success());
        assert!(WebhookResponse { status: 503 }.is_server_error());
        assert!(!WebhookResponse { status: 404 }.is_server_error());
    }

    #[test]
    fn should_mark_timeout_and_transient_as_retryable() {
        assert!(WebhookDeliveryError::Timeout.is_retryable());
        assert!(WebhookDeliveryError::Transient("reset".to_string()).is_retryable());
        assert!(!WebhookDeliveryError::Permanent("bad url".to_string()).is_retryable());
    }
}
