//! In-process gateway for tests and examples.
//!
//! [`MemoryGateway`] keeps the two tables in memory, mints row ids, and
//! emits change events synchronously on every write, so a store wired to
//! it behaves exactly like one wired to the hosted service minus the
//! network. Failure injection makes the error paths testable.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::{HabitId, HabitRow, LogId, LogPatch, LogRow, NewHabit, NewLog, UserId};

use super::{ChangeEvent, ChangeFeed, ChangeOp, Gateway, Table};

/// Capacity of the per-table change broadcast. Writes are human-paced;
/// a small buffer is plenty, and laggards collapse to a resync event.
const CHANGE_BUFFER: usize = 32;

/// An in-memory stand-in for the hosted data service.
///
/// Rows live behind locks; habits are stored in insertion order and
/// returned newest first, which is what `created_at` descending yields on
/// the real service. The `habit_logs` table carries a unique
/// `(habit_id, date)` key: inserting a second log for the same pair
/// updates the existing row.
///
/// Cloning shares the underlying tables, so one clone can play "another
/// device" writing behind a store's back.
#[derive(Clone)]
pub struct MemoryGateway {
    inner: Arc<Inner>,
}

struct Inner {
    habits: RwLock<Vec<HabitRow>>,
    logs: RwLock<Vec<LogRow>>,
    habits_tx: broadcast::Sender<ChangeEvent>,
    logs_tx: broadcast::Sender<ChangeEvent>,
    failing: RwLock<bool>,
}

impl MemoryGateway {
    /// Create an empty gateway
    #[must_use]
    pub fn new() -> Self {
        let (habits_tx, _) = broadcast::channel(CHANGE_BUFFER);
        let (logs_tx, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            inner: Arc::new(Inner {
                habits: RwLock::new(Vec::new()),
                logs: RwLock::new(Vec::new()),
                habits_tx,
                logs_tx,
                failing: RwLock::new(false),
            }),
        }
    }

    /// Make every subsequent remote operation fail (or stop doing so).
    ///
    /// Test hook simulating a lost connection to the service.
    pub fn fail_requests(&self, failing: bool) {
        *self.inner.failing.write() = failing;
    }

    /// Number of rows currently in the `habits` table
    #[must_use]
    pub fn habit_count(&self) -> usize {
        self.inner.habits.read().len()
    }

    /// Number of rows currently in the `habit_logs` table
    #[must_use]
    pub fn log_count(&self) -> usize {
        self.inner.logs.read().len()
    }

    fn check_reachable(&self, on_fail: fn(String) -> Error) -> Result<()> {
        if *self.inner.failing.read() {
            Err(on_fail("simulated connection loss".to_string()))
        } else {
            Ok(())
        }
    }

    fn emit(&self, table: Table, op: ChangeOp, row_id: &str) {
        let event = ChangeEvent {
            table,
            op,
            row_id: Some(row_id.to_string()),
        };
        let tx = match table {
            Table::Habits => &self.inner.habits_tx,
            Table::HabitLogs => &self.inner.logs_tx,
        };
        // No subscribers is fine
        let _ = tx.send(event);
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn select_habits(&self, user: &UserId) -> Result<Vec<HabitRow>> {
        self.check_reachable(|m| Error::Fetch(m.into()))?;
        let habits = self.inner.habits.read();
        Ok(habits
            .iter()
            .rev()
            .filter(|row| &row.user_id == user)
            .cloned()
            .collect())
    }

    async fn select_logs(&self, habit_ids: &[HabitId]) -> Result<Vec<LogRow>> {
        self.check_reachable(|m| Error::Fetch(m.into()))?;
        let logs = self.inner.logs.read();
        Ok(logs
            .iter()
            .filter(|row| habit_ids.contains(&row.habit_id))
            .cloned()
            .collect())
    }

    async fn insert_habit(&self, habit: NewHabit) -> Result<HabitRow> {
        self.check_reachable(|m| Error::Write(m.into()))?;
        let row = HabitRow {
            id: HabitId::new(Uuid::new_v4().to_string()),
            name: habit.name,
            user_id: habit.user_id,
            created_at: Utc::now(),
        };
        self.inner.habits.write().push(row.clone());
        debug!(id = %row.id, name = %row.name, "habit row inserted");
        self.emit(Table::Habits, ChangeOp::Insert, row.id.as_str());
        Ok(row)
    }

    async fn delete_habit(&self, id: &HabitId) -> Result<()> {
        self.check_reachable(|m| Error::Write(m.into()))?;

        let removed = {
            let mut habits = self.inner.habits.write();
            let before = habits.len();
            habits.retain(|row| &row.id != id);
            before != habits.len()
        };

        // Deleting a row that is already gone acks like the real service
        if removed {
            let cascaded = {
                let mut logs = self.inner.logs.write();
                let before = logs.len();
                logs.retain(|row| &row.habit_id != id);
                before - logs.len()
            };
            debug!(id = %id, cascaded, "habit row deleted");
            self.emit(Table::Habits, ChangeOp::Delete, id.as_str());
            if cascaded > 0 {
                self.emit(Table::HabitLogs, ChangeOp::Delete, id.as_str());
            }
        }
        Ok(())
    }

    async fn insert_log(&self, log: NewLog) -> Result<LogRow> {
        self.check_reachable(|m| Error::Write(m.into()))?;

        let mut logs = self.inner.logs.write();

        // Unique (habit_id, date) key: a second insert for the pair lands
        // as an update of the existing row.
        if let Some(existing) = logs
            .iter_mut()
            .find(|row| row.habit_id == log.habit_id && row.date == log.date)
        {
            existing.completed = log.completed;
            existing.notes = Some(log.notes);
            let row = existing.clone();
            drop(logs);
            self.emit(Table::HabitLogs, ChangeOp::Update, row.id.as_str());
            return Ok(row);
        }

        let row = LogRow {
            id: LogId::new(Uuid::new_v4().to_string()),
            habit_id: log.habit_id,
            date: log.date,
            completed: log.completed,
            notes: Some(log.notes),
        };
        logs.push(row.clone());
        drop(logs);
        self.emit(Table::HabitLogs, ChangeOp::Insert, row.id.as_str());
        Ok(row)
    }

    async fn update_log(&self, id: &LogId, patch: LogPatch) -> Result<()> {
        self.check_reachable(|m| Error::Write(m.into()))?;

        let mut logs = self.inner.logs.write();
        let Some(row) = logs.iter_mut().find(|row| &row.id == id) else {
            return Err(Error::write(format!("log row not found: {id}")));
        };
        if let Some(completed) = patch.completed {
            row.completed = completed;
        }
        if let Some(notes) = patch.notes {
            row.notes = Some(notes);
        }
        drop(logs);
        self.emit(Table::HabitLogs, ChangeOp::Update, id.as_str());
        Ok(())
    }

    fn subscribe(&self, table: Table) -> Result<ChangeFeed> {
        let receiver = match table {
            Table::Habits => self.inner.habits_tx.subscribe(),
            Table::HabitLogs => self.inner.logs_tx.subscribe(),
        };
        Ok(ChangeFeed::new(table, receiver, None))
    }
}
