//! Tracing-backed notifier — the in-process default delivery channel.
//!
//! Real deployments register an adapter for their email/push channel;
//! this one emits the notification as a structured log line so the
//! standalone daemon has a working `send_notification` target.

use std::future::Future;

use tracing::info;

use wareflow_domain::error::WareflowError;

use crate::ports::{Notification, Notifier};

/// Notifier that logs deliveries instead of sending them anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(
        &self,
        notification: Notification,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        info!(
            tenant_id = %notification.tenant_id,
            recipient = %notification.recipient,
            subject = %notification.subject,
            "notification"
        );
        async { Ok(()) }
    }
}
