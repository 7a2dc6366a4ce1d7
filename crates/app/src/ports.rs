//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside
//! world. They are defined here (in `app`) so that both the engine and the
//! adapter layer can depend on them without creating circular dependencies.
//!
//! The engine consumes the surrounding CRUD modules only through these
//! traits: it never hard-codes another module's schema.

pub mod event_bus;
pub mod execution_store;
pub mod integrations;
pub mod job_repo;
pub mod rule_repo;
pub mod template_repo;

pub use event_bus::EventPublisher;
pub use execution_store::ExecutionStore;
pub use integrations::{
    EntityCommands, Notification, Notifier, WebhookClient, WebhookDeliveryError, WebhookRequest,
    WebhookResponse,
};
pub use job_repo::ScheduledJobRepository;
pub use rule_repo::RuleRepository;
pub use template_repo::TemplateRepository;
