//! Configuration for the hosted data service.
//!
//! This module provides the [`Config`] struct used by the REST gateway.
//! Configuration includes the service base URL, the API key, and the
//! request timeout and change-feed poll cadence.
//!
//! # Example
//!
//! ```rust
//! use habitsync::Config;
//!
//! // Minimal configuration
//! let config = Config::new("https://project.example.co", "anon-key");
//!
//! // Full configuration with builder pattern
//! let config = Config::new("https://project.example.co", "anon-key")
//!     .with_request_timeout(10)
//!     .with_poll_interval(3);
//! ```

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Configuration for connecting to the hosted data service.
///
/// The service is expected to expose its tables over a PostgREST-style
/// HTTP interface under `{base_url}/rest/v1/{table}`, authenticated with
/// an API key sent both as `apikey` and as a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the data service, e.g. `https://project.example.co`.
    pub base_url: String,

    /// API key for the service.
    pub api_key: String,

    /// Timeout in seconds for a single HTTP request.
    pub request_timeout_secs: u64,

    /// Interval in seconds between change-feed polls.
    ///
    /// The REST gateway watches tables by polling; this is the cadence.
    /// Default is 5 seconds.
    pub poll_interval_secs: u64,
}

impl Config {
    /// Create a new configuration for the given service
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }

    /// Set the per-request timeout
    #[must_use]
    pub const fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Set the change-feed poll interval
    #[must_use]
    pub const fn with_poll_interval(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    /// URL of a table's REST endpoint
    #[must_use]
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::new("https://example.co", "key");
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new("https://example.co", "key")
            .with_request_timeout(10)
            .with_poll_interval(2);

        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.poll_interval_secs, 2);
    }

    #[test]
    fn test_table_url_strips_trailing_slash() {
        let config = Config::new("https://example.co/", "key");
        assert_eq!(config.table_url("habits"), "https://example.co/rest/v1/habits");
    }
}
