//! Authenticated identity provider.
//!
//! Authentication itself happens against the hosted service (out of band);
//! this module tracks *who is currently signed in* and lets other parts of
//! the crate observe sign-in and sign-out transitions.
//!
//! The [`HabitStore`](crate::store::HabitStore) reactor follows a session's
//! [`watch`](Session::watch) channel: an identity becoming available loads
//! the mirror and establishes change-feed subscriptions, the identity being
//! cleared tears both down.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::model::UserId;

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account identifier; all remote rows are scoped to it
    pub user_id: UserId,
    /// Email address, when the auth provider supplies one
    pub email: Option<String>,
}

impl Identity {
    /// Create an identity from a user id
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            email: None,
        }
    }

    /// Attach an email address
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Shared handle to the current authentication state.
///
/// Cloning is cheap; all clones observe the same state. The handle starts
/// signed out.
#[derive(Debug, Clone)]
pub struct Session {
    tx: watch::Sender<Option<Identity>>,
}

impl Session {
    /// Create a signed-out session
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Record a successful sign-in
    pub fn sign_in(&self, identity: Identity) {
        tracing::info!(user = %identity.user_id, "signed in");
        self.tx.send_replace(Some(identity));
    }

    /// Clear the identity
    pub fn sign_out(&self) {
        if self.tx.send_replace(None).is_some() {
            tracing::info!("signed out");
        }
    }

    /// The current identity, or `None` when signed out
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    /// Whether an identity is currently available
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Subscribe to identity changes.
    ///
    /// The receiver yields the new identity state on every sign-in and
    /// sign-out, starting from the state at subscription time.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_signed_out() {
        let session = Session::new();
        assert!(!session.is_authenticated());
        assert!(session.current().is_none());
    }

    #[test]
    fn test_sign_in_and_out() {
        let session = Session::new();
        session.sign_in(Identity::new(UserId::new("u1")).with_email("a@b.co"));

        let identity = session.current().unwrap();
        assert_eq!(identity.user_id.as_str(), "u1");
        assert_eq!(identity.email.as_deref(), Some("a@b.co"));

        session.sign_out();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::new();
        let other = session.clone();
        session.sign_in(Identity::new(UserId::new("u1")));
        assert!(other.is_authenticated());
    }

    #[tokio::test]
    async fn test_watch_observes_transitions() {
        let session = Session::new();
        let mut rx = session.watch();

        session.sign_in(Identity::new(UserId::new("u1")));
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_some());

        session.sign_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }
}
