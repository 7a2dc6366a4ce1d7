//! Built-in action handlers, registered at the composition root.
//!
//! Each handler adapts one [`ActionKind`](wareflow_domain::rule::ActionKind)
//! to an integration port; the `trigger_rule` kind has no handler here
//! because chaining is implemented by the runner itself.

mod entity;
mod notify;
mod webhook;

pub use entity::{CreateEntityHandler, UpdateEntityFieldHandler};
pub use notify::NotificationHandler;
pub use webhook::WebhookHandler;

use wareflow_domain::error::ActionError;
use wareflow_domain::rule::ActionConfig;

/// A handler received a config for a kind it was not registered for.
/// Indicates a mis-wired registry, not a user error.
pub(crate) fn misrouted(config: &ActionConfig) -> ActionError {
    ActionError::Handler(format!("handler received mismatched config `{config}`"))
}
