//! The habit synchronization store.
//!
//! [`HabitStore`] owns the in-memory mirror of the signed-in user's habits
//! and logs, exposes the mutation operations the view layer calls, and
//! keeps a selected-habit / selected-date cursor consistent with the
//! mirror.
//!
//! # Mirror discipline
//!
//! The mirror is replaced wholesale by [`HabitStore::refresh`] and only
//! adjusted in place by `create_habit` (prepend) and `delete_habit`
//! (remove). Log writes never touch the mirror directly: they are written
//! through to the data service, and the change-feed reactor runs the
//! refresh that lands them locally. There is therefore a short window
//! after a successful write in which the mirror still shows the old
//! state, bounded by change-feed latency.
//!
//! # Lifecycle
//!
//! 1. Create with [`HabitStore::new`], injecting the gateway, session, and
//!    notification sink
//! 2. Call [`HabitStore::start`] to spawn the reactor that follows the
//!    session and the change feeds
//! 3. Call [`HabitStore::shutdown`] to tear the reactor down
//!
//! The store is a cheap clone-able handle; all clones share state.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use habitsync::{HabitStore, Identity, LogNotifier, MemoryGateway, Session, UserId};
//!
//! # async fn example() -> habitsync::Result<()> {
//! let session = Session::new();
//! let store = HabitStore::new(
//!     Arc::new(MemoryGateway::new()),
//!     session.clone(),
//!     Arc::new(LogNotifier),
//! );
//! store.start();
//!
//! session.sign_in(Identity::new(UserId::new("user-1")));
//!
//! let habit = store.create_habit("Stretch").await?;
//! store.select_habit(Some(&habit.id));
//! store.toggle_completion(&habit.id, "2024-01-15".parse().unwrap(), true).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gateway::{ChangeEvent, ChangeFeed, Gateway, Table};
use crate::model::{self, Habit, HabitId, HabitLog, LogPatch, NewHabit, NewLog, UserId};
use crate::notify::{Notification, Notifier};
use crate::session::Session;

/// State of the background reactor task.
enum ReactorState {
    /// No reactor task is running
    Idle,
    /// Reactor task is running
    Running {
        shutdown_tx: watch::Sender<bool>,
        handle: JoinHandle<()>,
    },
}

struct Inner {
    gateway: Arc<dyn Gateway>,
    session: Session,
    notifier: Arc<dyn Notifier>,
    /// Mirror of remote state, newest-created habit first
    mirror: RwLock<Vec<Habit>>,
    /// Selected habit cursor; always resolved against the mirror on read
    selected_habit: RwLock<Option<HabitId>>,
    /// Selected calendar-date cursor, local only
    selected_date: RwLock<NaiveDate>,
    reactor: Mutex<ReactorState>,
}

/// Synchronization store for the signed-in user's habits.
#[derive(Clone)]
pub struct HabitStore {
    inner: Arc<Inner>,
}

impl HabitStore {
    /// Create a store. The mirror starts empty and the selected date
    /// defaults to today.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>, session: Session, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                session,
                notifier,
                mirror: RwLock::new(Vec::new()),
                selected_habit: RwLock::new(None),
                selected_date: RwLock::new(chrono::Local::now().date_naive()),
                reactor: Mutex::new(ReactorState::Idle),
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of the mirror, newest-created habit first
    #[must_use]
    pub fn habits(&self) -> Vec<Habit> {
        self.inner.mirror.read().clone()
    }

    /// Id of the selected habit, if any
    #[must_use]
    pub fn selected_habit_id(&self) -> Option<HabitId> {
        self.inner.selected_habit.read().clone()
    }

    /// The selected habit, resolved against the current mirror.
    ///
    /// Resolution happens on every read rather than holding a habit
    /// snapshot, so the result always reflects the latest refresh.
    #[must_use]
    pub fn selected_habit(&self) -> Option<Habit> {
        let selected = self.inner.selected_habit.read();
        let id = selected.as_ref()?;
        self.inner
            .mirror
            .read()
            .iter()
            .find(|habit| &habit.id == id)
            .cloned()
    }

    /// The selected calendar date
    #[must_use]
    pub fn selected_date(&self) -> NaiveDate {
        *self.inner.selected_date.read()
    }

    /// Find a habit's log for a date. Pure mirror lookup, no remote call.
    #[must_use]
    pub fn log_for_date(&self, habit_id: &HabitId, date: NaiveDate) -> Option<HabitLog> {
        self.inner
            .mirror
            .read()
            .iter()
            .find(|habit| &habit.id == habit_id)
            .and_then(|habit| habit.log_for_date(date))
            .cloned()
    }

    // =========================================================================
    // Cursors
    // =========================================================================

    /// Select a habit by id, or clear the selection with `None`.
    ///
    /// Selecting an id that is not in the mirror clears the selection;
    /// this never fails.
    pub fn select_habit(&self, id: Option<&HabitId>) {
        let resolved = match id {
            Some(id) if self.inner.mirror.read().iter().any(|h| &h.id == id) => Some(id.clone()),
            _ => None,
        };
        *self.inner.selected_habit.write() = resolved;
    }

    /// Move the calendar-date cursor
    pub fn select_date(&self, date: NaiveDate) {
        *self.inner.selected_date.write() = date;
    }

    // =========================================================================
    // Remote operations
    // =========================================================================

    /// Reload the mirror from the data service.
    ///
    /// Without a signed-in identity this clears the mirror and returns.
    /// Habits are fetched newest first; their logs follow in one batched
    /// lookup, skipped entirely when there are no habits. A failed fetch
    /// leaves the previous mirror in place and surfaces a notification —
    /// it is never returned to the caller.
    pub async fn refresh(&self) {
        let Some(identity) = self.inner.session.current() else {
            debug!("refresh without identity, clearing mirror");
            self.replace_mirror(Vec::new());
            return;
        };

        match self.fetch_mirror(&identity.user_id).await {
            Ok(habits) => {
                debug!(count = habits.len(), "mirror refreshed");
                self.replace_mirror(habits);
            }
            Err(e) => {
                warn!(error = %e, "mirror refresh failed, keeping previous state");
                self.inner
                    .notifier
                    .notify(Notification::error("Error", "Failed to load your habits"));
            }
        }
    }

    /// Create a habit and prepend it to the mirror.
    ///
    /// Requires a signed-in identity and a name that is non-empty after
    /// trimming. Remote failures surface a notification and are returned,
    /// so the calling form can stay in a retry-able state.
    pub async fn create_habit(&self, name: &str) -> Result<Habit> {
        let Some(identity) = self.inner.session.current() else {
            self.inner
                .notifier
                .notify(Notification::error("Error", "Failed to create habit"));
            return Err(Error::AuthRequired);
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_input("habit name must not be empty"));
        }

        match self
            .inner
            .gateway
            .insert_habit(NewHabit {
                name: name.to_string(),
                user_id: identity.user_id,
            })
            .await
        {
            Ok(row) => {
                let habit = Habit {
                    id: row.id,
                    name: row.name,
                    logs: Vec::new(),
                };
                self.inner.mirror.write().insert(0, habit.clone());
                info!(habit = %habit.id, "habit created");
                self.inner.notifier.notify(Notification::info(
                    "Habit created",
                    format!("{} has been added to your habits", habit.name),
                ));
                Ok(habit)
            }
            Err(e) => {
                warn!(error = %e, "habit creation failed");
                self.inner
                    .notifier
                    .notify(Notification::error("Error", "Failed to create habit"));
                Err(e)
            }
        }
    }

    /// Delete a habit. The data service cascades deletion of its logs.
    ///
    /// On success the habit leaves the mirror and, if it was selected, the
    /// selection clears. On failure the mirror is untouched, a
    /// notification is surfaced, and the error is returned.
    pub async fn delete_habit(&self, id: &HabitId) -> Result<()> {
        if let Err(e) = self.inner.gateway.delete_habit(id).await {
            warn!(habit = %id, error = %e, "habit deletion failed");
            self.inner.notifier.notify(Notification::error(
                "Error",
                "Failed to delete habit. Please try again.",
            ));
            return Err(e);
        }

        let removed = {
            let mut mirror = self.inner.mirror.write();
            mirror
                .iter()
                .position(|habit| &habit.id == id)
                .map(|index| mirror.remove(index))
        };

        if let Some(habit) = removed {
            {
                let mut selected = self.inner.selected_habit.write();
                if selected.as_ref() == Some(id) {
                    *selected = None;
                }
            }
            info!(habit = %id, "habit deleted");
            self.inner.notifier.notify(Notification::error(
                "Habit deleted",
                format!("{} has been removed from your habits", habit.name),
            ));
        }

        Ok(())
    }

    /// Set a habit's completion state for a date.
    ///
    /// Updates the existing log when one is already persisted for the
    /// date, otherwise inserts a fresh one with empty notes. The mirror is
    /// not touched here; the change feed drives the refresh that makes the
    /// write visible locally.
    pub async fn toggle_completion(
        &self,
        habit_id: &HabitId,
        date: NaiveDate,
        completed: bool,
    ) -> Result<()> {
        let existing = self.log_for_date(habit_id, date);

        let result = match existing.and_then(|log| log.id) {
            Some(log_id) => {
                self.inner
                    .gateway
                    .update_log(&log_id, LogPatch::completion(completed))
                    .await
            }
            None => self
                .inner
                .gateway
                .insert_log(NewLog {
                    habit_id: habit_id.clone(),
                    date,
                    completed,
                    notes: String::new(),
                })
                .await
                .map(|_| ()),
        };

        if let Err(e) = result {
            warn!(habit = %habit_id, %date, error = %e, "completion toggle failed");
            self.inner
                .notifier
                .notify(Notification::error("Error", "Failed to update habit status"));
            return Err(e);
        }

        debug!(habit = %habit_id, %date, completed, "completion persisted");
        Ok(())
    }

    /// Set a habit's notes for a date.
    ///
    /// Same update-or-insert branching as [`toggle_completion`]; a log
    /// created from a note edit starts uncompleted. The mirror catches up
    /// via the change feed.
    ///
    /// [`toggle_completion`]: HabitStore::toggle_completion
    pub async fn update_notes(&self, habit_id: &HabitId, date: NaiveDate, notes: &str) -> Result<()> {
        let existing = self.log_for_date(habit_id, date);

        let result = match existing.and_then(|log| log.id) {
            Some(log_id) => {
                self.inner
                    .gateway
                    .update_log(&log_id, LogPatch::notes(notes))
                    .await
            }
            None => self
                .inner
                .gateway
                .insert_log(NewLog {
                    habit_id: habit_id.clone(),
                    date,
                    completed: false,
                    notes: notes.to_string(),
                })
                .await
                .map(|_| ()),
        };

        if let Err(e) = result {
            warn!(habit = %habit_id, %date, error = %e, "notes update failed");
            self.inner
                .notifier
                .notify(Notification::error("Error", "Failed to save notes"));
            return Err(e);
        }

        debug!(habit = %habit_id, %date, "notes persisted");
        Ok(())
    }

    // =========================================================================
    // Reactor lifecycle
    // =========================================================================

    /// Spawn the background reactor.
    ///
    /// The reactor follows the session: when an identity becomes
    /// available it subscribes to both tables' change feeds and loads the
    /// mirror; when the identity clears it drops the subscriptions and
    /// empties the mirror. Change events trigger a full refresh.
    ///
    /// Calling `start` on a store whose reactor is already running is a
    /// no-op. Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut reactor = self.inner.reactor.lock();
        if matches!(&*reactor, ReactorState::Running { .. }) {
            debug!("reactor already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_reactor(self.clone(), shutdown_rx));
        *reactor = ReactorState::Running {
            shutdown_tx,
            handle,
        };
        info!("habit store reactor started");
    }

    /// Whether the reactor is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(&*self.inner.reactor.lock(), ReactorState::Running { .. })
    }

    /// Stop the background reactor. Idempotent.
    pub async fn shutdown(&self) {
        let state = std::mem::replace(&mut *self.inner.reactor.lock(), ReactorState::Idle);
        let ReactorState::Running {
            shutdown_tx,
            handle,
        } = state
        else {
            debug!("reactor not running, nothing to shut down");
            return;
        };

        if shutdown_tx.send(true).is_err() {
            debug!("reactor already stopped (receiver dropped)");
        }

        match tokio::time::timeout(Duration::from_secs(5), handle).await {
            Ok(Ok(())) => debug!("reactor stopped gracefully"),
            Ok(Err(e)) => warn!("reactor task panicked: {e}"),
            Err(_) => warn!("reactor did not stop within timeout"),
        }

        info!("habit store reactor shut down");
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Replace the mirror wholesale and re-derive the selection: an id
    /// that no longer resolves (deleted remotely, excluded by a refresh)
    /// clears it.
    fn replace_mirror(&self, habits: Vec<Habit>) {
        let mut mirror = self.inner.mirror.write();
        *mirror = habits;

        let mut selected = self.inner.selected_habit.write();
        if let Some(id) = selected.clone() {
            if !mirror.iter().any(|habit| habit.id == id) {
                debug!(habit = %id, "selected habit left the mirror, clearing selection");
                *selected = None;
            }
        }
    }

    async fn fetch_mirror(&self, user: &UserId) -> Result<Vec<Habit>> {
        let habit_rows = self.inner.gateway.select_habits(user).await?;
        if habit_rows.is_empty() {
            // No habits means no logs to look up
            return Ok(Vec::new());
        }

        let ids: Vec<HabitId> = habit_rows.iter().map(|row| row.id.clone()).collect();
        let log_rows = self.inner.gateway.select_logs(&ids).await?;
        Ok(model::attach_logs(habit_rows, log_rows))
    }
}

// =============================================================================
// Reactor
// =============================================================================

async fn run_reactor(store: HabitStore, mut shutdown_rx: watch::Receiver<bool>) {
    let mut session_rx = store.inner.session.watch();

    'outer: loop {
        // Signed-out phase: wait for an identity.
        let identity = loop {
            if let Some(identity) = session_rx.borrow_and_update().clone() {
                break identity;
            }
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break 'outer;
                    }
                }
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break 'outer;
                    }
                }
            }
        };

        debug!(user = %identity.user_id, "identity available, subscribing to change feeds");
        let mut habits_feed = subscribe_or_warn(&store, Table::Habits);
        let mut logs_feed = subscribe_or_warn(&store, Table::HabitLogs);

        store.refresh().await;

        // Signed-in phase: refresh on every change event until the
        // identity changes or shutdown is requested.
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break 'outer;
                    }
                }
                changed = session_rx.changed() => {
                    if changed.is_err() {
                        break 'outer;
                    }
                    if session_rx.borrow().is_none() {
                        debug!("identity cleared, tearing down change feeds");
                        store.replace_mirror(Vec::new());
                    }
                    // The feeds scoped to the previous identity drop here;
                    // the outer loop rebuilds them for the next one.
                    continue 'outer;
                }
                event = next_event(&mut habits_feed) => {
                    debug!(table = %event.table, op = ?event.op, "change event, refreshing");
                    store.refresh().await;
                }
                event = next_event(&mut logs_feed) => {
                    debug!(table = %event.table, op = ?event.op, "change event, refreshing");
                    store.refresh().await;
                }
            }
        }
    }

    info!("habit store reactor stopped");
}

fn subscribe_or_warn(store: &HabitStore, table: Table) -> Option<ChangeFeed> {
    match store.inner.gateway.subscribe(table) {
        Ok(feed) => Some(feed),
        Err(e) => {
            warn!(table = %table, error = %e, "change feed unavailable, live updates disabled");
            None
        }
    }
}

/// Next event from an optional feed. A closed feed empties its slot; an
/// empty slot pends forever, letting the other `select!` branches win.
async fn next_event(slot: &mut Option<ChangeFeed>) -> ChangeEvent {
    loop {
        match slot {
            Some(feed) => match feed.next().await {
                Some(event) => return event,
                None => {
                    warn!(table = %feed.table(), "change feed closed");
                    *slot = None;
                }
            },
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use crate::notify::{ChannelNotifier, Severity};
    use crate::session::Identity;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn signed_in_store() -> (
        HabitStore,
        MemoryGateway,
        Session,
        UnboundedReceiver<Notification>,
    ) {
        let gateway = MemoryGateway::new();
        let session = Session::new();
        session.sign_in(Identity::new(crate::model::UserId::new("user-1")));
        let (notifier, notifications) = ChannelNotifier::new();
        let store = HabitStore::new(Arc::new(gateway.clone()), session.clone(), Arc::new(notifier));
        (store, gateway, session, notifications)
    }

    #[tokio::test]
    async fn test_create_habits_newest_first_with_empty_logs() {
        let (store, _, _, _) = signed_in_store();

        store.create_habit("Read").await.unwrap();
        store.create_habit("Run").await.unwrap();
        store.create_habit("Stretch").await.unwrap();

        let habits = store.habits();
        let names: Vec<&str> = habits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, ["Stretch", "Run", "Read"]);
        assert!(habits.iter().all(|h| h.logs.is_empty()));

        // The ordering survives a round-trip through the service
        store.refresh().await;
        let names: Vec<String> = store.habits().into_iter().map(|h| h.name).collect();
        assert_eq!(names, ["Stretch", "Run", "Read"]);
    }

    #[tokio::test]
    async fn test_create_habit_requires_identity() {
        let (store, gateway, session, mut notifications) = signed_in_store();
        session.sign_out();

        let result = store.create_habit("Read").await;
        assert!(matches!(result, Err(Error::AuthRequired)));
        assert_eq!(gateway.habit_count(), 0);

        let toast = notifications.try_recv().unwrap();
        assert_eq!(toast.description, "Failed to create habit");
    }

    #[tokio::test]
    async fn test_create_habit_rejects_blank_names_before_any_remote_call() {
        let (store, gateway, _, _) = signed_in_store();

        assert!(matches!(
            store.create_habit("").await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            store.create_habit("   ").await,
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(gateway.habit_count(), 0);
    }

    #[tokio::test]
    async fn test_create_habit_trims_name() {
        let (store, _, _, _) = signed_in_store();
        let habit = store.create_habit("  Read  ").await.unwrap();
        assert_eq!(habit.name, "Read");
    }

    #[tokio::test]
    async fn test_create_failure_notifies_and_reraises() {
        let (store, gateway, _, mut notifications) = signed_in_store();
        gateway.fail_requests(true);

        let result = store.create_habit("Read").await;
        assert!(matches!(result, Err(Error::Write(_))));
        assert!(store.habits().is_empty());

        let toast = notifications.try_recv().unwrap();
        assert_eq!(toast.severity, Severity::Error);
        assert_eq!(toast.description, "Failed to create habit");
    }

    #[tokio::test]
    async fn test_refresh_unauthenticated_is_noop_that_empties() {
        let (store, _, session, _) = signed_in_store();
        store.create_habit("Read").await.unwrap();
        assert_eq!(store.habits().len(), 1);

        session.sign_out();
        store.refresh().await;
        assert!(store.habits().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_mirror_and_notifies() {
        let (store, gateway, _, mut notifications) = signed_in_store();
        store.create_habit("Read").await.unwrap();
        let _ = notifications.try_recv(); // drain the creation toast

        gateway.fail_requests(true);
        store.refresh().await;

        assert_eq!(store.habits().len(), 1, "mirror must stay stale, not empty");
        let toast = notifications.try_recv().unwrap();
        assert_eq!(toast.description, "Failed to load your habits");
        assert_eq!(toast.severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_write_through_without_optimistic_update() {
        let (store, _, _, _) = signed_in_store();
        let habit = store.create_habit("Read").await.unwrap();

        store
            .toggle_completion(&habit.id, date("2024-01-15"), true)
            .await
            .unwrap();

        // Not visible until a refresh lands it
        assert!(store.log_for_date(&habit.id, date("2024-01-15")).is_none());

        store.refresh().await;
        let log = store.log_for_date(&habit.id, date("2024-01-15")).unwrap();
        assert!(log.completed);
        assert_eq!(log.notes, "");
    }

    #[tokio::test]
    async fn test_toggle_is_idempotent_per_date() {
        let (store, gateway, _, _) = signed_in_store();
        let habit = store.create_habit("Read").await.unwrap();
        let day = date("2024-01-15");

        store.toggle_completion(&habit.id, day, true).await.unwrap();
        store.refresh().await;
        store.toggle_completion(&habit.id, day, true).await.unwrap();
        store.refresh().await;
        store.toggle_completion(&habit.id, day, false).await.unwrap();
        store.refresh().await;

        assert_eq!(gateway.log_count(), 1, "one log per (habit, date)");
        let log = store.log_for_date(&habit.id, day).unwrap();
        assert!(!log.completed);
    }

    #[tokio::test]
    async fn test_update_notes_inserts_uncompleted_log() {
        let (store, _, _, _) = signed_in_store();
        let habit = store.create_habit("Read").await.unwrap();
        let day = date("2024-01-15");

        store.update_notes(&habit.id, day, "chapter 3").await.unwrap();
        store.refresh().await;

        let log = store.log_for_date(&habit.id, day).unwrap();
        assert!(!log.completed);
        assert_eq!(log.notes, "chapter 3");

        // A later toggle keeps the notes
        store.toggle_completion(&habit.id, day, true).await.unwrap();
        store.refresh().await;
        let log = store.log_for_date(&habit.id, day).unwrap();
        assert!(log.completed);
        assert_eq!(log.notes, "chapter 3");
    }

    #[tokio::test]
    async fn test_toggle_failure_notifies_and_reraises() {
        let (store, gateway, _, mut notifications) = signed_in_store();
        let habit = store.create_habit("Read").await.unwrap();
        let _ = notifications.try_recv();

        gateway.fail_requests(true);
        let result = store
            .toggle_completion(&habit.id, date("2024-01-15"), true)
            .await;

        assert!(matches!(result, Err(Error::Write(_))));
        let toast = notifications.try_recv().unwrap();
        assert_eq!(toast.description, "Failed to update habit status");
    }

    #[tokio::test]
    async fn test_delete_clears_selection_iff_selected() {
        let (store, _, _, _) = signed_in_store();
        let first = store.create_habit("Read").await.unwrap();
        let second = store.create_habit("Run").await.unwrap();

        // Deleting an unselected habit leaves the selection alone
        store.select_habit(Some(&second.id));
        store.delete_habit(&first.id).await.unwrap();
        assert_eq!(store.selected_habit_id(), Some(second.id.clone()));

        // Deleting the selected habit clears it
        store.delete_habit(&second.id).await.unwrap();
        assert!(store.selected_habit_id().is_none());
        assert!(store.habits().is_empty());
    }

    #[tokio::test]
    async fn test_delete_preserves_order_of_remaining() {
        let (store, _, _, _) = signed_in_store();
        let first = store.create_habit("Read").await.unwrap();
        store.create_habit("Run").await.unwrap();
        store.create_habit("Stretch").await.unwrap();

        store.delete_habit(&first.id).await.unwrap();
        let names: Vec<String> = store.habits().into_iter().map(|h| h.name).collect();
        assert_eq!(names, ["Stretch", "Run"]);

        store.refresh().await;
        let names: Vec<String> = store.habits().into_iter().map(|h| h.name).collect();
        assert_eq!(names, ["Stretch", "Run"]);
    }

    #[tokio::test]
    async fn test_delete_removes_logs_with_habit() {
        let (store, _, _, _) = signed_in_store();
        let habit = store.create_habit("Read").await.unwrap();
        let day = date("2024-01-15");
        store.toggle_completion(&habit.id, day, true).await.unwrap();
        store.refresh().await;

        store.delete_habit(&habit.id).await.unwrap();
        assert!(store.log_for_date(&habit.id, day).is_none());
    }

    #[tokio::test]
    async fn test_delete_failure_keeps_mirror_and_reraises() {
        let (store, gateway, _, mut notifications) = signed_in_store();
        let habit = store.create_habit("Read").await.unwrap();
        let _ = notifications.try_recv();

        gateway.fail_requests(true);
        let result = store.delete_habit(&habit.id).await;

        assert!(matches!(result, Err(Error::Write(_))));
        assert_eq!(store.habits().len(), 1);
        let toast = notifications.try_recv().unwrap();
        assert_eq!(toast.description, "Failed to delete habit. Please try again.");
    }

    #[tokio::test]
    async fn test_select_unknown_id_clears_selection() {
        let (store, _, _, _) = signed_in_store();
        let habit = store.create_habit("Read").await.unwrap();

        store.select_habit(Some(&habit.id));
        assert_eq!(store.selected_habit().unwrap().name, "Read");

        store.select_habit(Some(&HabitId::new("not-there")));
        assert!(store.selected_habit_id().is_none());

        store.select_habit(None);
        assert!(store.selected_habit_id().is_none());
    }

    #[tokio::test]
    async fn test_selection_rederived_when_habit_vanishes_on_refresh() {
        let (store, gateway, _, _) = signed_in_store();
        let habit = store.create_habit("Read").await.unwrap();
        store.select_habit(Some(&habit.id));

        // Another device deletes the habit behind this store's back
        gateway.delete_habit(&habit.id).await.unwrap();
        store.refresh().await;

        assert!(store.selected_habit_id().is_none());
        assert!(store.selected_habit().is_none());
    }

    #[tokio::test]
    async fn test_selected_habit_reflects_latest_refresh() {
        let (store, gateway, _, _) = signed_in_store();
        let habit = store.create_habit("Read").await.unwrap();
        store.select_habit(Some(&habit.id));

        // A second client logs a completion; after refresh the selected
        // habit resolves to the updated row, not a stale snapshot.
        gateway
            .insert_log(NewLog {
                habit_id: habit.id.clone(),
                date: date("2024-01-15"),
                completed: true,
                notes: String::new(),
            })
            .await
            .unwrap();
        store.refresh().await;

        let selected = store.selected_habit().unwrap();
        assert_eq!(selected.logs.len(), 1);
    }

    #[tokio::test]
    async fn test_date_cursor() {
        let (store, _, _, _) = signed_in_store();
        let day = date("2024-02-29");
        store.select_date(day);
        assert_eq!(store.selected_date(), day);
    }

    #[tokio::test]
    async fn test_notification_wording() {
        let (store, _, _, mut notifications) = signed_in_store();
        let habit = store.create_habit("Drink water").await.unwrap();

        let created = notifications.try_recv().unwrap();
        assert_eq!(created.title, "Habit created");
        assert_eq!(created.description, "Drink water has been added to your habits");
        assert_eq!(created.severity, Severity::Info);

        store.delete_habit(&habit.id).await.unwrap();
        let deleted = notifications.try_recv().unwrap();
        assert_eq!(deleted.title, "Habit deleted");
        assert_eq!(
            deleted.description,
            "Drink water has been removed from your habits"
        );
        assert_eq!(deleted.severity, Severity::Error);
    }
}
