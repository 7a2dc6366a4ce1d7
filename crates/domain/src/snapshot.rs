//! Snapshot — a typed field map extracted from an entity or event payload.
//!
//! Conditions are evaluated against snapshots, never against live entities,
//! so evaluation is pure, repeatable, and safe under concurrent retries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single typed snapshot value.
///
/// The closed variant set keeps condition coercion rules exhaustive.
/// Dates travel as RFC 3339 strings and are only interpreted as instants
/// when a condition declares `ValueType::Date`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// True when the value is [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Into::into).collect())
            }
            serde_json::Value::Object(fields) => Self::Map(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, value.into()))
                    .collect(),
            ),
        }
    }
}

/// A flat-rooted map of field values with dotted-path lookup into nested maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    fields: BTreeMap<String, Value>,
}

impl Snapshot {
    /// Create an empty snapshot (used for schedule and manual triggers).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from a JSON object.
    ///
    /// Non-object JSON values produce an empty snapshot; payloads are
    /// always objects at the event boundary.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match Value::from(value) {
            Value::Map(fields) => Self { fields },
            _ => Self::default(),
        }
    }

    /// Insert or replace a root field.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Look up a dotted path (e.g. `"new.status"`), descending into
    /// [`Value::Map`] entries. Returns `None` when any segment is absent.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.fields.get(first)?;
        for segment in segments {
            match current {
                Value::Map(nested) => current = nested.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Borrow a nested map field as a sub-snapshot view.
    #[must_use]
    pub fn sub_map(&self, key: &str) -> Option<&BTreeMap<String, Value>> {
        match self.fields.get(key) {
            Some(Value::Map(nested)) => Some(nested),
            _ => None,
        }
    }

    /// True when the snapshot holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over root-level fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

impl FromIterator<(String, Value)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
