//! Trigger — what causes a rule to be considered for firing.

use serde::{Deserialize, Serialize};

use crate::event::{EntityEvent, EventKind};
use crate::schedule::Schedule;

/// Describes when an automation rule activates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires when a CRUD module raises a matching entity event.
    EntityEvent {
        /// Entity type to watch (e.g. `"SalesOrder"`).
        entity_type: String,
        /// Event kind to watch (e.g. `created`, `status_changed`).
        event: EventKind,
    },
    /// Fires on a cron schedule, evaluated in the given timezone.
    Schedule {
        /// 5-field cron expression.
        cron: String,
        /// IANA timezone identifier.
        timezone: String,
    },
    /// Fires only when triggered explicitly through the operator surface.
    Manual,
}

impl Trigger {
    /// Check whether this trigger matches a given entity event.
    ///
    /// `Schedule` and `Manual` triggers never match broadcast events; they
    /// are activated through the scheduler loop and the operator surface.
    #[must_use]
    pub fn matches_event(&self, event: &EntityEvent) -> bool {
        match self {
            Self::EntityEvent {
                entity_type,
                event: kind,
            } => entity_type == &event.entity_type && kind == &event.kind,
            Self::Schedule { .. } | Self::Manual => false,
        }
    }

    /// Borrow the schedule of a `Schedule` trigger, if any.
    ///
    /// The returned [`Schedule`] is *not* yet validated; call
    /// [`Schedule::validate`] (rule validation does this at save time).
    #[must_use]
    pub fn schedule(&self) -> Option<Schedule> {
        match self {
            Self::Schedule { cron, timezone } => Some(Schedule {
                expression: cron.clone(),
                timezone: timezone.clone(),
            }),
            Self::EntityEvent { .. } | Self::Manual => None,
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntityEvent { entity_type, event } => {
                write!(f, "entity_event({entity_type}, {event})")
            }
            Self::Schedule { cron, timezone } => write!(f, "schedule({cron} @ {timezone})"),
            Self::Manual => f.write_str("manual"),
        }
    }
}
