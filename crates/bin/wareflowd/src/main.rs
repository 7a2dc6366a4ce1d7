//! # wareflowd — wareflow engine daemon
//!
//! Composition root that wires the adapters to the engine and runs it.
//!
//! ## Responsibilities
//! - Parse configuration (TOML file, env vars)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repository implementations (adapters)
//! - Register the built-in action handlers
//! - Wire the trigger dispatcher to the in-process event bus
//! - Run the scheduler loop in the background
//! - Handle shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wareflow_adapter_storage_sqlite_sqlx::{
    Config as DbConfig, SqliteEntityCommands, SqliteExecutionStore, SqliteJobRepository,
    SqliteRuleRepository, SqliteTemplateRepository,
};
use wareflow_adapter_webhook_reqwest::ReqwestWebhookClient;
use wareflow_app::actions::{
    CreateEntityHandler, NotificationHandler, UpdateEntityFieldHandler, WebhookHandler,
};
use wareflow_app::dispatcher::TriggerDispatcher;
use wareflow_app::event_bus::InProcessEventBus;
use wareflow_app::notifier::TracingNotifier;
use wareflow_app::recorder::ExecutionRecorder;
use wareflow_app::registry::ActionRegistry;
use wareflow_app::runner::RuleRunner;
use wareflow_app::scheduler::SchedulerLoop;
use wareflow_domain::rule::ActionKind;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = DbConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    // Repositories
    let rule_repo = SqliteRuleRepository::new(pool.clone());
    let job_repo = SqliteJobRepository::new(pool.clone());
    let execution_store = SqliteExecutionStore::new(pool.clone());
    let template_repo = SqliteTemplateRepository::new(pool.clone());
    let entity_commands = SqliteEntityCommands::new(pool);

    // Action handlers
    let engine_config = config.engine_config();
    let webhook_client = ReqwestWebhookClient::new()
        .map_err(|err| anyhow::anyhow!("failed to build webhook client: {err}"))?;
    let mut registry = ActionRegistry::new();
    registry.register(
        ActionKind::CreateEntity,
        Arc::new(CreateEntityHandler::new(entity_commands.clone())),
    );
    registry.register(
        ActionKind::UpdateEntityField,
        Arc::new(UpdateEntityFieldHandler::new(entity_commands)),
    );
    registry.register(
        ActionKind::SendNotification,
        Arc::new(NotificationHandler::new(TracingNotifier)),
    );
    registry.register(
        ActionKind::InvokeWebhook,
        Arc::new(WebhookHandler::new(
            webhook_client,
            engine_config.webhook_max_retries,
            engine_config.webhook_backoff_base,
        )),
    );

    // Engine
    let runner = Arc::new(RuleRunner::new(
        rule_repo,
        ExecutionRecorder::new(execution_store),
        template_repo,
        Arc::new(registry),
        engine_config.clone(),
    ));
    let dispatcher = Arc::new(TriggerDispatcher::new(Arc::clone(&runner)));
    let scheduler = SchedulerLoop::new(Arc::clone(&runner), job_repo, engine_config);

    // Event bus: CRUD modules publish committed writes here; the
    // dispatcher consumes them.
    let event_bus = Arc::new(InProcessEventBus::new(256));
    let mut events = event_bus.subscribe();
    tokio::spawn({
        let dispatcher = Arc::clone(&dispatcher);
        async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Err(err) = dispatcher.on_entity_event(&event).await {
                            error!(error = %err, "event dispatch failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event bus lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    });

    let scheduler_task = tokio::spawn(async move { scheduler.run().await });

    info!("wareflowd running; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    scheduler_task.abort();

    Ok(())
}
