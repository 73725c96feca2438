//! HTTP adapter for the local sidecar service that owns the on-device
//! database.
//!
//! The sidecar exposes export and merge endpoints dedicated to sync:
//! `GET /sync/export/{table}`, `GET /sync/export/{table}/{id}`,
//! `POST /sync/merge`, and full-replace endpoints for the shared mirrors.

use super::LocalStore;
use crate::error::{SyncError, SyncResult};
use crate::merge::MergeReport;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use verba_types::{MirrorTable, Record, Table};

/// Where the sidecar listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SidecarConfig {
    /// Base URL, e.g. `http://127.0.0.1:8765`.
    pub base_url: String,
    /// Request timeout (ms).
    pub timeout_ms: u64,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8765".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl SidecarConfig {
    /// The sidecar announces a free port at startup; point at it.
    pub fn for_port(port: u16) -> Self {
        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct MergeRequest<'a> {
    table: &'a str,
    rows: &'a [Record],
}

#[derive(Debug, Serialize)]
struct MirrorRequest<'a> {
    rows: &'a [Record],
}

#[derive(Debug, Deserialize)]
struct MirrorResponse {
    replaced: usize,
}

/// [`LocalStore`] backed by the sidecar's HTTP API.
pub struct SidecarStore {
    config: SidecarConfig,
    client: Client,
}

impl SidecarStore {
    pub fn new(config: SidecarConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn mirror_path(mirror: MirrorTable) -> &'static str {
        match mirror {
            MirrorTable::SharedTemplates => "/templates/shared/sync",
            MirrorTable::SharedTeachingPoints => "/teaching-points/shared/sync",
        }
    }

    async fn check(response: reqwest::Response) -> SyncResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(SyncError::Storage(format!("sidecar returned {status}: {message}")))
    }
}

#[async_trait]
impl LocalStore for SidecarStore {
    async fn list_all(&self, table: Table) -> SyncResult<Vec<Record>> {
        self.export_all(table).await
    }

    async fn export_all(&self, table: Table) -> SyncResult<Vec<Record>> {
        let response = self
            .client
            .get(self.url(&format!("/sync/export/{table}")))
            .send()
            .await?;
        let rows: Vec<Record> = Self::check(response).await?.json().await?;
        debug!("Exported {} rows from {}", rows.len(), table);
        Ok(rows)
    }

    async fn export_record(&self, table: Table, local_id: &str) -> SyncResult<Option<Record>> {
        let response = self
            .client
            .get(self.url(&format!("/sync/export/{table}/{local_id}")))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::check(response).await?.json().await?))
    }

    async fn merge_rows(&self, table: Table, rows: Vec<Record>) -> SyncResult<MergeReport> {
        if rows.is_empty() {
            return Ok(MergeReport::default());
        }
        let body = MergeRequest {
            table: table.as_str(),
            rows: &rows,
        };
        let response = self
            .client
            .post(self.url("/sync/merge"))
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn replace_mirror(&self, mirror: MirrorTable, rows: Vec<Record>) -> SyncResult<usize> {
        let response = self
            .client
            .post(self.url(Self::mirror_path(mirror)))
            .json(&MirrorRequest { rows: &rows })
            .send()
            .await?;
        let body: MirrorResponse = Self::check(response).await?.json().await?;
        Ok(body.replaced)
    }
}
