//! Condition — one field/operator/value predicate against a snapshot.
//!
//! All conditions on a rule are AND-combined; there is no nested boolean
//! grouping. Evaluation is pure and never fails: a coercion problem makes
//! the single condition false, not the whole dispatch an error.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::snapshot::{Snapshot, Value};
use crate::time::Timestamp;

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    Contains,
    In,
    IsNull,
    IsNotNull,
    /// The field's previous value equals the condition value and the field
    /// actually changed. Requires `old`/`new` sub-maps in the snapshot.
    ChangedFrom,
    /// The field's current value equals the condition value and the field
    /// actually changed. Requires `old`/`new` sub-maps in the snapshot.
    ChangedTo,
}

impl Operator {
    /// Whether this operator needs a comparison value.
    #[must_use]
    pub fn requires_value(self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::Contains => "contains",
            Self::In => "in",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::ChangedFrom => "changed_from",
            Self::ChangedTo => "changed_to",
        };
        f.write_str(name)
    }
}

/// Declared type of a condition's stored value, used to coerce the
/// string-encoded value before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Date,
    List,
}

/// Result of checking a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionCheck {
    /// The predicate holds.
    Pass,
    /// The predicate does not hold.
    Fail,
    /// The stored value could not be coerced to its declared type; the
    /// condition counts as failed but callers may log the distinction.
    CoercionFailed,
}

impl ConditionCheck {
    /// True only for [`ConditionCheck::Pass`].
    #[must_use]
    pub fn passed(self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// A single predicate evaluated against a trigger's snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted path into the snapshot (e.g. `"new.status"` or `"carrier.code"`).
    pub field: String,
    pub operator: Operator,
    /// String-encoded comparison value; absent for `is_null`/`is_not_null`.
    #[serde(default)]
    pub value: Option<String>,
    pub value_type: ValueType,
}

/// The condition value after coercion per its declared [`ValueType`].
#[derive(Debug, Clone, PartialEq)]
enum Expected {
    Str(String),
    Num(f64),
    Bool(bool),
    Date(Timestamp),
    /// Raw list items, compared per the actual value's type.
    Items(Vec<String>),
}

impl Condition {
    /// Convenience constructor for the common case.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: Some(value.into()),
            value_type,
        }
    }

    /// Constructor for the valueless `is_null`/`is_not_null` operators.
    #[must_use]
    pub fn presence(field: impl Into<String>, operator: Operator) -> Self {
        Self {
            field: field.into(),
            operator,
            value: None,
            value_type: ValueType::String,
        }
    }

    /// Evaluate against a snapshot; shorthand for `check(..).passed()`.
    #[must_use]
    pub fn evaluate(&self, snapshot: &Snapshot) -> bool {
        self.check(snapshot).passed()
    }

    /// Evaluate with a distinguished outcome for coercion failures.
    #[must_use]
    pub fn check(&self, snapshot: &Snapshot) -> ConditionCheck {
        match self.operator {
            Operator::IsNull => {
                if snapshot.get_path(&self.field).is_none_or(Value::is_null) {
                    ConditionCheck::Pass
                } else {
                    ConditionCheck::Fail
                }
            }
            Operator::IsNotNull => {
                if snapshot.get_path(&self.field).is_some_and(|v| !v.is_null()) {
                    ConditionCheck::Pass
                } else {
                    ConditionCheck::Fail
                }
            }
            Operator::ChangedFrom | Operator::ChangedTo => self.check_changed(snapshot),
            _ => {
                let Some(expected) = self.coerced() else {
                    return ConditionCheck::CoercionFailed;
                };
                let Some(actual) = snapshot.get_path(&self.field) else {
                    return ConditionCheck::Fail;
                };
                if apply(self.operator, actual, &expected) {
                    ConditionCheck::Pass
                } else {
                    ConditionCheck::Fail
                }
            }
        }
    }

    /// `changed_from`/`changed_to` compare the `old` and `new` sub-maps.
    /// Snapshots without both (creates, schedule and manual triggers)
    /// evaluate to false rather than erroring.
    fn check_changed(&self, snapshot: &Snapshot) -> ConditionCheck {
        if snapshot.sub_map("old").is_none() || snapshot.sub_map("new").is_none() {
            return ConditionCheck::Fail;
        }
        let Some(expected) = self.coerced() else {
            return ConditionCheck::CoercionFailed;
        };
        let old = snapshot.get_path(&format!("old.{}", self.field));
        let new = snapshot.get_path(&format!("new.{}", self.field));
        if old == new {
            return ConditionCheck::Fail;
        }
        let side = match self.operator {
            Operator::ChangedFrom => old,
            _ => new,
        };
        match side {
            Some(actual) if apply(Operator::Equals, actual, &expected) => ConditionCheck::Pass,
            _ => ConditionCheck::Fail,
        }
    }

    fn coerced(&self) -> Option<Expected> {
        let raw = self.value.as_deref()?;
        match self.value_type {
            ValueType::String => Some(Expected::Str(raw.to_string())),
            ValueType::Number => raw.trim().parse().ok().map(Expected::Num),
            ValueType::Boolean => match raw.trim() {
                "true" | "1" => Some(Expected::Bool(true)),
                "false" | "0" => Some(Expected::Bool(false)),
                _ => None,
            },
            ValueType::Date => DateTime::parse_from_rfc3339(raw.trim())
                .ok()
                .map(|dt| Expected::Date(dt.to_utc())),
            ValueType::List => Some(Expected::Items(parse_items(raw))),
        }
    }
}

/// Parse a list value: a JSON array first, comma-separated items otherwise.
fn parse_items(raw: &str) -> Vec<String> {
    if let Ok(serde_json::Value::Array(items)) = serde_json::from_str(raw) {
        return items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
    }
    raw.split(',').map(|item| item.trim().to_string()).collect()
}

fn apply(operator: Operator, actual: &Value, expected: &Expected) -> bool {
    match operator {
        Operator::Equals => equals(actual, expected),
        Operator::NotEquals => !equals(actual, expected),
        Operator::GreaterThan => ordering(actual, expected).is_some_and(std::cmp::Ordering::is_gt),
        Operator::LessThan => ordering(actual, expected).is_some_and(std::cmp::Ordering::is_lt),
        Operator::Contains => contains(actual, expected),
        Operator::In => is_in(actual, expected),
        _ => false,
    }
}

#[allow(clippy::float_cmp)]
fn equals(actual: &Value, expected: &Expected) -> bool {
    match (actual, expected) {
        (Value::String(a), Expected::Str(e)) => a == e,
        (Value::Number(a), Expected::Num(e)) => a == e,
        (Value::Bool(a), Expected::Bool(e)) => a == e,
        (Value::String(a), Expected::Date(e)) => {
            DateTime::parse_from_rfc3339(a).is_ok_and(|dt| dt.to_utc() == *e)
        }
        (Value::List(items), Expected::Items(expected_items)) => {
            items.len() == expected_items.len()
                && items
                    .iter()
                    .zip(expected_items)
                    .all(|(item, e)| value_matches_item(item, e))
        }
        _ => false,
    }
}

fn ordering(actual: &Value, expected: &Expected) -> Option<std::cmp::Ordering> {
    match (actual, expected) {
        (Value::Number(a), Expected::Num(e)) => a.partial_cmp(e),
        (Value::String(a), Expected::Str(e)) => Some(a.as_str().cmp(e.as_str())),
        (Value::String(a), Expected::Date(e)) => DateTime::parse_from_rfc3339(a)
            .ok()
            .map(|dt| dt.to_utc().cmp(e)),
        _ => None,
    }
}

fn contains(actual: &Value, expected: &Expected) -> bool {
    match (actual, expected) {
        (Value::String(a), Expected::Str(e)) => a.contains(e.as_str()),
        (Value::List(items), _) => items.iter().any(|item| equals(item, expected)),
        _ => false,
    }
}

fn is_in(actual: &Value, expected: &Expected) -> bool {
    match expected {
        Expected::Items(items) => items.iter().any(|item| value_matches_item(actual, item)),
        _ => false,
    }
}

#[allow(clippy::float_cmp)]
fn value_matches_item(actual: &Value, item: &str) -> bool {
    match actual {
        Value::String(a) => a == item,
        Value::Number(a) => item.trim().parse::<f64>().is_ok_and(|n| n == *a),
        Value::Bool(a) => item.trim().parse::<bool>().is_ok_and(|b| b == *a),
        _ => false,
    }
}

/// Evaluate a rule's conditions (logical AND). An empty list is
/// unconditionally true.
#[must_use]
pub fn evaluate_all(conditions: &[Condition], snapshot: &Snapshot) -> bool {
    conditions
        .iter()
        .all(|condition| condition.evaluate(snapshot))
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} {value}", self.field, self.operator),
            None => write!(f, "{} {}", self.field, self.operator),
        }
    }
}
