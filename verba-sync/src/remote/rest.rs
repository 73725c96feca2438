//! PostgREST remote store client.
//!
//! Speaks the REST dialect exposed by Supabase-style backends:
//! `GET /rest/v1/{relation}?col=eq.value&order=updated_at.desc`,
//! `POST` with `Prefer: resolution=merge-duplicates` for upserts and
//! `DELETE` with the same filter syntax.
//!
//! PostgREST applies a batch insert atomically, so one bad row fails the
//! whole request with a 4xx. The engine isolates such rows by resending the
//! chunk one row at a time.

use super::{RemoteStore, UpsertOutcome};
use crate::error::{SyncError, SyncResult};
use crate::query::{Filter, SelectQuery};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;
use verba_types::{ConflictKey, Record};

/// Environment variable holding the backend base URL.
pub const ENV_REMOTE_URL: &str = "VERBA_REMOTE_URL";
/// Environment variable holding the backend's public API key.
pub const ENV_REMOTE_API_KEY: &str = "VERBA_REMOTE_API_KEY";

/// Connection settings for the REST backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    /// Base URL, e.g. `https://project.supabase.co`.
    pub base_url: String,
    /// Public (anon) API key sent as `apikey`.
    pub api_key: String,
    /// Path prefix of the REST endpoint.
    pub rest_path: String,
    /// Client-level request timeout (ms).
    pub timeout_ms: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            rest_path: "/rest/v1".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl RestConfig {
    /// Reads the backend location from the environment.
    ///
    /// Returns `None` when no backend is configured; the engine then skips
    /// all remote work.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var(ENV_REMOTE_URL).ok().filter(|s| !s.is_empty())?;
        let api_key = std::env::var(ENV_REMOTE_API_KEY).ok().filter(|s| !s.is_empty())?;
        Some(Self {
            base_url,
            api_key,
            ..Default::default()
        })
    }
}

/// PostgREST [`RemoteStore`] implementation.
pub struct RestRemoteStore {
    config: RestConfig,
    client: Client,
    access_token: Arc<RwLock<Option<String>>>,
}

impl RestRemoteStore {
    /// Creates a client for the given backend.
    pub fn new(config: RestConfig) -> SyncResult<Self> {
        if config.base_url.is_empty() {
            return Err(SyncError::Config("remote base_url is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            config,
            client,
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Returns whether a session token is installed.
    pub fn has_access_token(&self) -> bool {
        self.access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn url(&self, relation: &str) -> String {
        format!(
            "{}{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.rest_path,
            relation
        )
    }

    /// Adds the API key and bearer token. Without a session token the API
    /// key doubles as the bearer, which only grants anonymous access.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .access_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_else(|| self.config.api_key.clone());
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(bearer)
    }

    fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
        filters
            .iter()
            .map(|f| (f.column.clone(), format!("{}.{}", f.op.as_str(), f.value)))
            .collect()
    }

    async fn send(&self, request: RequestBuilder) -> SyncResult<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Remote {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn post_rows(
        &self,
        relation: &str,
        rows: &[Record],
        conflict_key: ConflictKey,
    ) -> SyncResult<()> {
        let request = self
            .client
            .post(self.url(relation))
            .query(&[("on_conflict", conflict_key.remote_columns().join(","))])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows);
        self.send(request).await.map(|_| ())
    }
}

fn transport_error(e: reqwest::Error) -> SyncError {
    if e.is_timeout() {
        SyncError::Timeout
    } else {
        SyncError::Network(e.to_string())
    }
}

#[async_trait]
impl RemoteStore for RestRemoteStore {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn select(&self, relation: &str, query: &SelectQuery) -> SyncResult<Vec<Record>> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(Self::filter_params(&query.filters));
        if let Some(order) = &query.order_by {
            let dir = if order.descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{}.{dir}", order.column)));
        }

        let request = self.client.get(self.url(relation)).query(&params);
        let response = self.send(request).await?;
        let rows: Vec<Record> = response.json().await.map_err(|e| {
            SyncError::Network(format!("failed to decode {relation} rows: {e}"))
        })?;

        debug!("Selected {} rows from {}", rows.len(), relation);
        Ok(rows)
    }

    async fn upsert_batch(
        &self,
        relation: &str,
        rows: Vec<Record>,
        conflict_key: ConflictKey,
    ) -> SyncResult<UpsertOutcome> {
        if rows.is_empty() {
            return Ok(UpsertOutcome::ok());
        }

        self.post_rows(relation, &rows, conflict_key).await?;
        Ok(UpsertOutcome::ok())
    }

    async fn delete_by_key(&self, relation: &str, key: &[Filter]) -> SyncResult<()> {
        if key.is_empty() {
            return Err(SyncError::Config(format!(
                "refusing unfiltered delete on {relation}"
            )));
        }
        let request = self
            .client
            .delete(self.url(relation))
            .query(&Self::filter_params(key));
        self.send(request).await.map(|_| ())
    }

    fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }
}
