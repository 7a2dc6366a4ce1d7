//! Event bus port — publish entity events raised by CRUD modules.

use std::future::Future;

use wareflow_domain::error::WareflowError;
use wareflow_domain::event::EntityEvent;

/// Publishes entity events to interested subscribers.
///
/// CRUD modules call this after every committed write; the dispatcher
/// consumes the stream on the other side.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: EntityEvent)
    -> impl Future<Output = Result<(), WareflowError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        event: EntityEvent,
    ) -> impl Future<Output = Result<(), WareflowError>> + Send {
        (**self).publish(event)
    }
}
