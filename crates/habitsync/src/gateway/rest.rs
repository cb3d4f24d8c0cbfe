//! HTTP gateway for the hosted data service.
//!
//! [`RestGateway`] speaks the service's PostgREST-style dialect: filtered
//! selects, batched `in.(...)` lookups, inserts returning the stored
//! representation, and id-keyed PATCH/DELETE. The API key is sent both as
//! an `apikey` header and as a bearer token.
//!
//! Change feeds are backed by polling: a background task re-reads the
//! table on an interval and emits a resync event whenever the content
//! fingerprint moves. Row-level security on the service scopes every
//! request, polls included, to the signed-in user.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{HabitId, HabitRow, LogId, LogPatch, LogRow, NewHabit, NewLog, UserId};

use super::{ChangeEvent, ChangeFeed, Gateway, Table};

/// Capacity of the per-subscription change broadcast.
const CHANGE_BUFFER: usize = 16;

/// Gateway implementation over the service's REST interface.
pub struct RestGateway {
    config: Config,
    http: Client,
}

impl RestGateway {
    /// Build a gateway from a [`Config`].
    ///
    /// Fails with [`Error::Config`] when the API key cannot be used as an
    /// HTTP header value.
    pub fn new(config: Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|e| Error::config(format!("api key is not a valid header value: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| Error::config(format!("api key is not a valid header value: {e}")))?;
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, http })
    }

    /// Comma list for an `in.(...)` filter
    fn id_list(ids: &[HabitId]) -> String {
        let joined = ids
            .iter()
            .map(HabitId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        format!("in.({joined})")
    }

    /// Map a non-success response to an error, carrying whatever body the
    /// service sent along.
    async fn reject(response: Response, to_error: fn(String) -> Error) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        to_error(format!("server returned {status}: {body}"))
    }
}

#[async_trait]
impl Gateway for RestGateway {
    async fn select_habits(&self, user: &UserId) -> Result<Vec<HabitRow>> {
        let user_filter = format!("eq.{user}");
        let response = self
            .http
            .get(self.config.table_url(Table::Habits.as_str()))
            .query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("order", "created_at.desc"),
            ])
            .send()
            .await
            .map_err(|e| Error::fetch(format!("failed to reach data service: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::reject(response, |m| Error::Fetch(m.into())).await);
        }

        response
            .json()
            .await
            .map_err(|e| Error::fetch(format!("invalid habits payload: {e}")))
    }

    async fn select_logs(&self, habit_ids: &[HabitId]) -> Result<Vec<LogRow>> {
        let id_filter = Self::id_list(habit_ids);
        let response = self
            .http
            .get(self.config.table_url(Table::HabitLogs.as_str()))
            .query(&[("select", "*"), ("habit_id", id_filter.as_str())])
            .send()
            .await
            .map_err(|e| Error::fetch(format!("failed to reach data service: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::reject(response, |m| Error::Fetch(m.into())).await);
        }

        response
            .json()
            .await
            .map_err(|e| Error::fetch(format!("invalid logs payload: {e}")))
    }

    async fn insert_habit(&self, habit: NewHabit) -> Result<HabitRow> {
        let response = self
            .http
            .post(self.config.table_url(Table::Habits.as_str()))
            .header("Prefer", "return=representation")
            .json(&habit)
            .send()
            .await
            .map_err(|e| Error::write(format!("failed to reach data service: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::reject(response, |m| Error::Write(m.into())).await);
        }

        // The service answers inserts with an array of stored rows
        let mut rows: Vec<HabitRow> = response
            .json()
            .await
            .map_err(|e| Error::write(format!("invalid insert response: {e}")))?;
        rows.pop()
            .ok_or_else(|| Error::write("insert returned no representation"))
    }

    async fn delete_habit(&self, id: &HabitId) -> Result<()> {
        let response = self
            .http
            .delete(self.config.table_url(Table::Habits.as_str()))
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await
            .map_err(|e| Error::write(format!("failed to reach data service: {e}")))?;

        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(Self::reject(response, |m| Error::Write(m.into())).await);
        }
        Ok(())
    }

    async fn insert_log(&self, log: NewLog) -> Result<LogRow> {
        let response = self
            .http
            .post(self.config.table_url(Table::HabitLogs.as_str()))
            .header("Prefer", "return=representation,resolution=merge-duplicates")
            .json(&log)
            .send()
            .await
            .map_err(|e| Error::write(format!("failed to reach data service: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::reject(response, |m| Error::Write(m.into())).await);
        }

        let mut rows: Vec<LogRow> = response
            .json()
            .await
            .map_err(|e| Error::write(format!("invalid insert response: {e}")))?;
        rows.pop()
            .ok_or_else(|| Error::write("insert returned no representation"))
    }

    async fn update_log(&self, id: &LogId, patch: LogPatch) -> Result<()> {
        let response = self
            .http
            .patch(self.config.table_url(Table::HabitLogs.as_str()))
            .query(&[("id", format!("eq.{id}"))])
            .json(&patch)
            .send()
            .await
            .map_err(|e| Error::write(format!("failed to reach data service: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::reject(response, |m| Error::Write(m.into())).await);
        }
        Ok(())
    }

    fn subscribe(&self, table: Table) -> Result<ChangeFeed> {
        let (tx, receiver) = broadcast::channel(CHANGE_BUFFER);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let poller = Poller {
            http: self.http.clone(),
            url: self.config.table_url(table.as_str()),
            interval: Duration::from_secs(self.config.poll_interval_secs),
            table,
            tx,
        };
        tokio::spawn(poller.run(shutdown_rx));

        Ok(ChangeFeed::new(table, receiver, Some(shutdown_tx)))
    }
}

/// Background watcher for one table.
struct Poller {
    http: Client,
    url: String,
    interval: Duration,
    table: Table,
    tx: broadcast::Sender<ChangeEvent>,
}

impl Poller {
    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(table = %self.table, interval_secs = self.interval.as_secs(), "table poll started");

        let mut last_fingerprint: Option<u64> = None;

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.interval) => {
                    match self.fingerprint().await {
                        Ok(fingerprint) => {
                            let moved = last_fingerprint.is_some_and(|prev| prev != fingerprint);
                            last_fingerprint = Some(fingerprint);
                            if moved {
                                debug!(table = %self.table, "table content changed");
                                let _ = self.tx.send(ChangeEvent::resync(self.table));
                            }
                        }
                        Err(e) => {
                            // Transient poll failures are invisible to the
                            // store; the next successful poll catches up.
                            warn!(table = %self.table, error = %e, "table poll failed");
                        }
                    }
                }
            }
        }

        info!(table = %self.table, "table poll stopped");
    }

    /// Hash of the table's current content, in a stable row order.
    async fn fingerprint(&self) -> Result<u64> {
        let response = self
            .http
            .get(&self.url)
            .query(&[("select", "*"), ("order", "id")])
            .send()
            .await
            .map_err(|e| Error::fetch(format!("failed to reach data service: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::fetch(format!(
                "server returned {} while polling",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::fetch(format!("failed to read poll response: {e}")))?;

        let mut hasher = DefaultHasher::new();
        body.hash(&mut hasher);
        Ok(hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_list_filter() {
        let ids = vec![HabitId::new("a"), HabitId::new("b")];
        assert_eq!(RestGateway::id_list(&ids), "in.(a,b)");
        assert_eq!(RestGateway::id_list(&[]), "in.()");
    }

    #[test]
    fn test_new_rejects_unusable_api_key() {
        let config = Config::new("https://example.co", "bad\nkey");
        assert!(matches!(RestGateway::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_new_builds_with_valid_key() {
        let config = Config::new("https://example.co", "anon-key");
        assert!(RestGateway::new(config).is_ok());
    }
}
