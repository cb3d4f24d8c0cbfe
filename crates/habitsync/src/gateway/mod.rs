//! Remote store gateway.
//!
//! The hosted data service is consumed through the [`Gateway`] trait:
//! row-level reads and writes on the two tables, plus a per-table
//! subscribe primitive delivering [`ChangeEvent`]s. Two implementations
//! are provided:
//!
//! - [`RestGateway`]: talks to the real service over HTTP
//! - [`MemoryGateway`]: in-process tables for tests and examples
//!
//! The store treats change events purely as an invalidation signal; it
//! never applies a pushed delta to its mirror directly.

pub mod memory;
pub mod rest;

use std::fmt;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tracing::warn;

use crate::error::Result;
use crate::model::{HabitId, HabitRow, LogId, LogPatch, LogRow, NewHabit, NewLog, UserId};
use crate::{HABITS_TABLE, HABIT_LOGS_TABLE};

pub use memory::MemoryGateway;
pub use rest::RestGateway;

/// The two remote tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// `habits`
    Habits,
    /// `habit_logs`
    HabitLogs,
}

impl Table {
    /// The table's name on the data service
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Habits => HABITS_TABLE,
            Self::HabitLogs => HABIT_LOGS_TABLE,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    /// A row was inserted
    Insert,
    /// A row was updated
    Update,
    /// A row was deleted
    Delete,
    /// The table changed in some unobserved way; consumers should refetch
    Resync,
}

/// A change notification for one table.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Table the change happened on
    pub table: Table,
    /// Kind of change
    pub op: ChangeOp,
    /// Affected row, when the source can name one
    pub row_id: Option<String>,
}

impl ChangeEvent {
    /// Event that only says "this table moved, refetch it"
    #[must_use]
    pub fn resync(table: Table) -> Self {
        Self {
            table,
            op: ChangeOp::Resync,
            row_id: None,
        }
    }
}

/// A live subscription to one table's changes.
///
/// Dropping the feed unsubscribes: the gateway stops whatever work backs
/// the subscription (the REST gateway's poll task, for instance).
/// [`ChangeFeed::unsubscribe`] does the same thing explicitly.
pub struct ChangeFeed {
    table: Table,
    receiver: broadcast::Receiver<ChangeEvent>,
    /// Teardown signal for a gateway-side worker, when one exists
    shutdown: Option<watch::Sender<bool>>,
}

impl ChangeFeed {
    /// Build a feed from a broadcast receiver and an optional worker
    /// teardown signal.
    #[must_use]
    pub fn new(
        table: Table,
        receiver: broadcast::Receiver<ChangeEvent>,
        shutdown: Option<watch::Sender<bool>>,
    ) -> Self {
        Self {
            table,
            receiver,
            shutdown,
        }
    }

    /// The table this feed watches
    #[must_use]
    pub fn table(&self) -> Table {
        self.table
    }

    /// Wait for the next change event.
    ///
    /// Returns `None` once the gateway side has gone away. A feed that
    /// fell behind the broadcast buffer yields a
    /// [`ChangeOp::Resync`] event instead of the missed ones; for an
    /// invalidation signal that is equivalent.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Closed) => None,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(table = %self.table, missed, "change feed lagged, collapsing to resync");
                Some(ChangeEvent::resync(self.table))
            }
        }
    }

    /// Tear the subscription down explicitly
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for ChangeFeed {
    fn drop(&mut self) {
        if let Some(shutdown) = &self.shutdown {
            let _ = shutdown.send(true);
        }
    }
}

impl fmt::Debug for ChangeFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFeed")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

/// Row-level access to the hosted data service, scoped by user identity.
///
/// All methods map remote failures to [`Error::Fetch`](crate::Error::Fetch)
/// or [`Error::Write`](crate::Error::Write) according to whether they read
/// or mutate.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Fetch all habits owned by `user`, newest first (`created_at` descending)
    async fn select_habits(&self, user: &UserId) -> Result<Vec<HabitRow>>;

    /// Fetch all logs belonging to any habit in `habit_ids`, in one batched
    /// lookup
    async fn select_logs(&self, habit_ids: &[HabitId]) -> Result<Vec<LogRow>>;

    /// Insert a habit and return the stored row (with id and timestamp)
    async fn insert_habit(&self, habit: NewHabit) -> Result<HabitRow>;

    /// Delete a habit by id. The service cascades deletion of its logs.
    async fn delete_habit(&self, id: &HabitId) -> Result<()>;

    /// Insert a log row and return the stored row
    async fn insert_log(&self, log: NewLog) -> Result<LogRow>;

    /// Apply a partial update to a log row
    async fn update_log(&self, id: &LogId, patch: LogPatch) -> Result<()>;

    /// Open a change feed for one table
    fn subscribe(&self, table: Table) -> Result<ChangeFeed>;
}
