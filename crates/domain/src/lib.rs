//! # wareflow-domain
//!
//! Pure domain model for the wareflow automation rule engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Rules** (trigger → condition → action automations, per tenant)
//! - Define **Snapshots** (typed field maps extracted from entity events)
//! - Define **Events** (entity create/update/delete notifications)
//! - Define **Schedules** (cron expression + timezone, next-fire-time math)
//! - Define **Executions** (durable one-per-attempt firing records)
//! - Define **Scheduled jobs** (durable wake-me-at-T markers with claiming)
//! - Define **Action templates** (reusable named action configurations)
//! - Contain all invariant enforcement and pure evaluation logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod event;
pub mod execution;
pub mod job;
pub mod rule;
pub mod schedule;
pub mod snapshot;
pub mod template;
