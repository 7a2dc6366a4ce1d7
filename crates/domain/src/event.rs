//! Event — an immutable record of a committed write in a CRUD module.
//!
//! CRUD modules raise one [`EntityEvent`] per committed create, update, or
//! delete. The engine only ever sees these events; it never reads live
//! entity state.

use serde::{Deserialize, Serialize};

use crate::id::{EventId, TenantId};
use crate::snapshot::{Snapshot, Value};
use crate::time::Timestamp;

/// Kind of entity event, e.g. `created` or a domain event like
/// `status_changed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
    /// A named domain event raised by a CRUD module (e.g. `status_changed`).
    Other(String),
}

impl From<String> for EventKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "created" => Self::Created,
            "updated" => Self::Updated,
            "deleted" => Self::Deleted,
            _ => Self::Other(value),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.to_string()
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
            Self::Deleted => f.write_str("deleted"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

impl std::str::FromStr for EventKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

/// A committed write raised by a CRUD module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityEvent {
    pub id: EventId,
    pub tenant_id: TenantId,
    /// Entity type the event concerns (e.g. `"SalesOrder"`).
    pub entity_type: String,
    pub kind: EventKind,
    /// State before the write; present only for update-style events.
    pub old: Option<Snapshot>,
    /// State after the write (empty for deletes).
    pub new: Snapshot,
    pub occurred_at: Timestamp,
}

impl EntityEvent {
    /// Create an event with a fresh id stamped at the current time.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        entity_type: impl Into<String>,
        kind: EventKind,
        old: Option<Snapshot>,
        new: Snapshot,
    ) -> Self {
        Self {
            id: EventId::new(),
            tenant_id,
            entity_type: entity_type.into(),
            kind,
            old,
            new,
            occurred_at: crate::time::now(),
        }
    }

    /// Build the snapshot conditions are evaluated against.
    ///
    /// New-state fields sit at the root so plain paths (`status`) resolve,
    /// and the full before/after states are available under `old` and `new`
    /// for `changed_from` / `changed_to` operators and explicit
    /// `new.`-prefixed paths.
    #[must_use]
    pub fn evaluation_snapshot(&self) -> Snapshot {
        let mut snapshot: Snapshot = self
            .new
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        snapshot.insert(
            "new",
            Value::Map(
                self.new
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
        );
        if let Some(old) = &self.old {
            snapshot.insert(
                "old",
                Value::Map(
                    old.iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect(),
                ),
            );
        }
        snapshot
    }
}
