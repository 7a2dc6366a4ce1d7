//! # wareflow-app
//!
//! Application layer — the automation engine and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `RuleRepository` — persistence for automation rules
//!   - `ScheduledJobRepository` — durable jobs with atomic claiming
//!   - `ExecutionStore` — append-only execution history
//!   - `TemplateRepository` — reusable action templates
//!   - `EntityCommands`, `Notifier`, `WebhookClient` — action side effects
//! - Provide the engine itself:
//!   - `TriggerDispatcher` — the event-driven path
//!   - `SchedulerLoop` — the time-driven path (claim-based, multi-instance safe)
//!   - `RuleRunner` — action resolution, handler dispatch, chain-depth guard
//!   - `ExecutionRecorder` — durable status transitions
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//! - Orchestrate domain objects without knowing *how* persistence or IO works
//!
//! ## Dependency rule
//! Depends on `wareflow-domain` only (plus `tokio::sync`/`tokio::time` for
//! channels and deadlines). Never imports adapter crates. Adapters depend on
//! *this* crate, not the reverse.

pub mod actions;
pub mod config;
pub mod dispatcher;
pub mod event_bus;
pub mod notifier;
pub mod ports;
pub mod recorder;
pub mod registry;
pub mod runner;
pub mod scheduler;
pub mod services;

#[cfg(test)]
mod fakes;
