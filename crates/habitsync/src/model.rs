//! Habits, logs, and the row types exchanged with the data service.
//!
//! [`Habit`] and [`HabitLog`] are the domain view held in the store's
//! mirror. The `*Row` types are the wire shapes of the two remote tables;
//! [`NewHabit`], [`NewLog`], and [`LogPatch`] are the write payloads.
//!
//! A habit's logs are keyed by calendar date: for a given habit there is at
//! most one log per date, and a second write for the same date updates the
//! existing row instead of creating a duplicate.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The identifier as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }
    };
}

id_type! {
    /// Opaque identifier of a habit row
    HabitId
}

id_type! {
    /// Opaque identifier of a habit log row
    LogId
}

id_type! {
    /// Opaque identifier of a user account
    UserId
}

/// A habit with its completion history, as held in the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Habit {
    /// Habit identifier
    pub id: HabitId,
    /// Display name
    pub name: String,
    /// Completion logs, in the order the data service returned them
    pub logs: Vec<HabitLog>,
}

impl Habit {
    /// Find this habit's log for a calendar date, if one exists
    #[must_use]
    pub fn log_for_date(&self, date: NaiveDate) -> Option<&HabitLog> {
        self.logs.iter().find(|log| log.date == date)
    }
}

/// One day's completion record for a habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitLog {
    /// Row identifier; `None` until the log has been persisted
    pub id: Option<LogId>,
    /// Owning habit
    pub habit_id: HabitId,
    /// Calendar date this log covers
    pub date: NaiveDate,
    /// Whether the habit was completed on this date
    pub completed: bool,
    /// Free-form notes, empty by default
    pub notes: String,
}

// =============================================================================
// Remote rows
// =============================================================================

/// A row of the `habits` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitRow {
    /// Row identifier
    pub id: HabitId,
    /// Display name
    pub name: String,
    /// Owning user
    pub user_id: UserId,
    /// Creation timestamp, used for newest-first ordering
    pub created_at: DateTime<Utc>,
}

/// A row of the `habit_logs` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRow {
    /// Row identifier
    pub id: LogId,
    /// Owning habit
    pub habit_id: HabitId,
    /// Calendar date this log covers
    pub date: NaiveDate,
    /// Whether the habit was completed on this date
    pub completed: bool,
    /// Notes; the service may return null for rows written without any
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<LogRow> for HabitLog {
    fn from(row: LogRow) -> Self {
        Self {
            id: Some(row.id),
            habit_id: row.habit_id,
            date: row.date,
            completed: row.completed,
            notes: row.notes.unwrap_or_default(),
        }
    }
}

/// Insert payload for the `habits` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewHabit {
    /// Display name
    pub name: String,
    /// Owning user
    pub user_id: UserId,
}

/// Insert payload for the `habit_logs` table.
#[derive(Debug, Clone, Serialize)]
pub struct NewLog {
    /// Owning habit
    pub habit_id: HabitId,
    /// Calendar date this log covers
    pub date: NaiveDate,
    /// Completion state
    pub completed: bool,
    /// Notes, empty unless the log is being created from a note edit
    pub notes: String,
}

/// Partial update for a `habit_logs` row. Fields left `None` are untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LogPatch {
    /// New completion state
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// New notes text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LogPatch {
    /// Patch that sets the completion state
    #[must_use]
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    /// Patch that sets the notes text
    #[must_use]
    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            ..Self::default()
        }
    }
}

/// Group log rows by habit and attach each group to its owning habit.
///
/// Habit order is preserved (the service returns them newest first); log
/// order within a habit is whatever the service returned. Logs whose
/// habit is not in `habits` are dropped.
pub(crate) fn attach_logs(habits: Vec<HabitRow>, logs: Vec<LogRow>) -> Vec<Habit> {
    let mut grouped: HashMap<HabitId, Vec<HabitLog>> = HashMap::new();
    for row in logs {
        grouped
            .entry(row.habit_id.clone())
            .or_default()
            .push(HabitLog::from(row));
    }

    habits
        .into_iter()
        .map(|row| Habit {
            logs: grouped.remove(&row.id).unwrap_or_default(),
            id: row.id,
            name: row.name,
        })
        .collect()
}
