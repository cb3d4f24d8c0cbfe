//! # HabitSync - Synchronization store for habit tracking apps
//!
//! HabitSync keeps an in-memory mirror of a user's habits and their daily
//! completion logs, backed by a hosted data service. The view layer reads
//! from the mirror and calls mutation operations; the store writes through
//! to the remote service and catches up via its change feed.
//!
//! ## Features
//!
//! - **Identity-scoped mirror**: Habits load when the user signs in and are
//!   cleared when the identity goes away.
//! - **Write-through mutations**: Creates, deletes, completion toggles, and
//!   note edits are persisted remotely; log writes reach the mirror on the
//!   next change-feed refresh rather than being applied optimistically.
//! - **Live updates**: Change feeds on both tables invalidate the mirror,
//!   so edits from other devices converge without user action.
//! - **Selection cursors**: A selected habit and selected calendar date are
//!   tracked locally and kept consistent with the mirror.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use habitsync::{HabitStore, Identity, LogNotifier, MemoryGateway, Session, UserId};
//!
//! #[tokio::main]
//! async fn main() -> habitsync::Result<()> {
//!     let gateway = Arc::new(MemoryGateway::new());
//!     let session = Session::new();
//!     let store = HabitStore::new(gateway, session.clone(), Arc::new(LogNotifier));
//!
//!     // React to sign-in/sign-out and remote changes in the background
//!     store.start();
//!
//!     session.sign_in(Identity::new(UserId::new("user-1")));
//!
//!     let habit = store.create_habit("Drink water").await?;
//!     store.toggle_completion(&habit.id, "2024-01-15".parse().unwrap(), true).await?;
//!
//!     store.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`config`]: Configuration for the hosted data service
//! - [`error`]: Error types and Result alias
//! - [`gateway`]: Remote store gateway trait and implementations
//! - [`model`]: Habits, logs, and remote row types
//! - [`notify`]: User-visible notification sink
//! - [`session`]: Authenticated identity provider
//! - [`store`]: The [`HabitStore`] synchronization core

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::all)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod model;
pub mod notify;
pub mod session;
pub mod store;

// =============================================================================
// Public re-exports - the primary public API
// =============================================================================

pub use config::Config;
pub use error::{Error, Result};
pub use gateway::{ChangeEvent, ChangeFeed, ChangeOp, Gateway, MemoryGateway, RestGateway, Table};
pub use model::{Habit, HabitId, HabitLog, LogId, UserId};
pub use notify::{ChannelNotifier, LogNotifier, Notification, Notifier, Severity};
pub use session::{Identity, Session};
pub use store::HabitStore;

// =============================================================================
// Constants
// =============================================================================

/// Remote table holding habit rows.
pub const HABITS_TABLE: &str = "habits";

/// Remote table holding per-day completion logs.
pub const HABIT_LOGS_TABLE: &str = "habit_logs";

/// Default interval in seconds between change-feed polls of the REST gateway.
///
/// Can be configured via [`Config::with_poll_interval`].
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default timeout in seconds for a single HTTP request to the data service.
///
/// Can be configured via [`Config::with_request_timeout`].
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum habit name length accepted by the presentation layer.
///
/// The store itself only rejects blank names; length is a form-level rule,
/// published here so every surface enforces the same limit.
pub const MAX_HABIT_NAME_LEN: usize = 50;
