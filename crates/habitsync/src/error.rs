//! Error types for HabitSync.
//!
//! This module defines the [`enum@Error`] enum and [`Result`] type alias used
//! throughout the library.
//!
//! # Error Categories
//!
//! Errors are categorized by the operation that failed:
//!
//! - [`Error::AuthRequired`] - A mutation was attempted with no signed-in identity
//! - [`Error::InvalidInput`] - Input rejected before any remote call was made
//! - [`Error::Fetch`] - A read from the data service failed (the mirror is left stale)
//! - [`Error::Write`] - A create/update/delete against the data service failed
//! - [`Error::Subscribe`] - A change-feed subscription could not be established
//! - [`Error::Config`] - Configuration issues (bad URL, unusable credentials)
//!
//! Fetch failures are reported through the notification sink and terminate at
//! the store boundary. Write failures are reported *and* returned, so callers
//! can keep their own UI in a retry-able state.

use std::sync::Arc;
use thiserror::Error;

/// Result type alias for HabitSync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in HabitSync operations
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// A mutation requires a signed-in identity
    #[error("authentication required")]
    AuthRequired,

    /// Input was rejected before reaching the data service
    #[error("invalid input: {0}")]
    InvalidInput(Arc<str>),

    /// A read from the data service failed
    #[error("fetch failed: {0}")]
    Fetch(Arc<str>),

    /// A write to the data service failed
    #[error("write failed: {0}")]
    Write(Arc<str>),

    /// A change-feed subscription could not be established
    #[error("subscription failed: {0}")]
    Subscribe(Arc<str>),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(Arc<str>),
}

impl Error {
    /// Create an invalid-input error
    #[inline]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(Arc::from(msg.into()))
    }

    /// Create a fetch error
    #[inline]
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(Arc::from(msg.into()))
    }

    /// Create a write error
    #[inline]
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(Arc::from(msg.into()))
    }

    /// Create a subscription error
    #[inline]
    pub fn subscribe(msg: impl Into<String>) -> Self {
        Self::Subscribe(Arc::from(msg.into()))
    }

    /// Create a configuration error
    #[inline]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(Arc::from(msg.into()))
    }

    /// Whether this error should be returned to the caller of a store
    /// mutation, as opposed to being terminal at the store boundary.
    #[must_use]
    pub fn is_recoverable_by_caller(&self) -> bool {
        !matches!(self, Self::Fetch(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::fetch("connection reset");
        assert_eq!(err.to_string(), "fetch failed: connection reset");

        assert_eq!(Error::AuthRequired.to_string(), "authentication required");
    }

    #[test]
    fn test_fetch_terminal_at_store_boundary() {
        assert!(!Error::fetch("x").is_recoverable_by_caller());
        assert!(Error::write("x").is_recoverable_by_caller());
        assert!(Error::AuthRequired.is_recoverable_by_caller());
    }
}
