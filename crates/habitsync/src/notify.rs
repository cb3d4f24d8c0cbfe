//! User-visible notification sink.
//!
//! The store reports outcomes (habit created, habit deleted, remote
//! failures) as fire-and-forget [`Notification`]s through a [`Notifier`].
//! A UI drains them into toasts; headless consumers can leave the default
//! [`LogNotifier`] in place and the messages land in the log stream.

use std::fmt;

use tokio::sync::mpsc;

/// How a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Routine confirmation
    Info,
    /// Failure or destructive outcome
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// A single user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Short heading, e.g. "Habit created"
    pub title: String,
    /// One-line detail, e.g. "Drink water has been added to your habits"
    pub description: String,
    /// Presentation severity
    pub severity: Severity,
}

impl Notification {
    /// Build an informational notification
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    /// Build an error notification
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }
}

/// Sink for user-visible notifications. Fire-and-forget: delivery is not
/// acknowledged and a full or disconnected sink must not fail the caller.
pub trait Notifier: Send + Sync {
    /// Deliver one notification
    fn notify(&self, notification: Notification);
}

/// Notifier that writes to the `tracing` log stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => tracing::info!(
                title = %notification.title,
                "{}", notification.description
            ),
            Severity::Error => tracing::warn!(
                title = %notification.title,
                "{}", notification.description
            ),
        }
    }
}

/// Notifier that queues notifications on an unbounded channel for a UI to
/// drain. Sends to a dropped receiver are silently discarded.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Create the notifier and the receiving end
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        let _ = self.tx.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_notifier_delivers() {
        let (notifier, mut rx) = ChannelNotifier::new();
        notifier.notify(Notification::info("Habit created", "Read has been added"));

        let received = rx.try_recv().unwrap();
        assert_eq!(received.title, "Habit created");
        assert_eq!(received.severity, Severity::Info);
    }

    #[test]
    fn test_channel_notifier_survives_dropped_receiver() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        // Must not panic or error
        notifier.notify(Notification::error("Error", "Failed to create habit"));
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Info.to_string(), "info");
        assert_eq!(Severity::Error.to_string(), "error");
    }
}
