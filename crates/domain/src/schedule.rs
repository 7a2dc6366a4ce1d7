//! Schedule — cron expression + timezone, and next-fire-time math.
//!
//! Occurrences are computed in the rule's own timezone and converted to UTC
//! for storage, so daylight-saving transitions keep wall-clock-equivalent
//! fire times. The computation is pure: the same `after` instant always
//! yields the same result.

use chrono_tz::Tz;
use croner::Cron;
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// Errors rejected at rule save time — a stored schedule never fails to
/// parse at fire time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// The cron expression does not parse as 5-field cron syntax.
    #[error("invalid schedule expression `{expression}`: {reason}")]
    InvalidExpression {
        /// The offending expression.
        expression: String,
        /// Parser diagnostic.
        reason: String,
    },

    /// The timezone is not a known IANA identifier.
    #[error("unknown timezone `{0}`")]
    UnknownTimezone(String),

    /// The expression never matches after the given instant.
    #[error("no upcoming occurrence for `{0}`")]
    NoUpcomingOccurrence(String),
}

/// A validated recurring schedule.
///
/// Standard 5-field cron syntax (minute, hour, day-of-month, month,
/// day-of-week) with `*`, ranges, lists, and `*/n` steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Cron expression, e.g. `"0 6 * * 1-5"`.
    pub expression: String,
    /// IANA timezone identifier, e.g. `"Europe/Amsterdam"`.
    pub timezone: String,
}

impl Schedule {
    /// Validate and construct a schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidExpression`] or
    /// [`ScheduleError::UnknownTimezone`].
    pub fn new(
        expression: impl Into<String>,
        timezone: impl Into<String>,
    ) -> Result<Self, ScheduleError> {
        let schedule = Self {
            expression: expression.into(),
            timezone: timezone.into(),
        };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Re-check the expression and timezone (used when deserializing rules
    /// written before a validation rule changed).
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidExpression`] or
    /// [`ScheduleError::UnknownTimezone`].
    pub fn validate(&self) -> Result<(), ScheduleError> {
        self.parsed()?;
        self.tz()?;
        Ok(())
    }

    /// Compute the first fire time strictly after `after`, in UTC.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::NoUpcomingOccurrence`] when the expression
    /// never matches again, or a validation error for a corrupted record.
    pub fn next_fire_time(&self, after: Timestamp) -> Result<Timestamp, ScheduleError> {
        let cron = self.parsed()?;
        let local = after.with_timezone(&self.tz()?);
        let next = cron
            .find_next_occurrence(&local, false)
            .map_err(|_| ScheduleError::NoUpcomingOccurrence(self.expression.clone()))?;
        Ok(next.with_timezone(&chrono::Utc))
    }

    fn parsed(&self) -> Result<Cron, ScheduleError> {
        Cron::new(&self.expression)
            .parse()
            .map_err(|err| ScheduleError::InvalidExpression {
                expression: self.expression.clone(),
                reason: err.to_string(),
            })
    }

    fn tz(&self) -> Result<Tz, ScheduleError> {
        self.timezone
            .parse()
            .map_err(|_| ScheduleError::UnknownTimezone(self.timezone.clone()))
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} @ {}", self.expression, self.timezone)
    }
}
