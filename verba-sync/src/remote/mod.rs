//! Remote store abstraction.
//!
//! The engine talks to the shared backend only through [`RemoteStore`]:
//! filtered selects, keyed batch upserts and keyed deletes. Concrete clients
//! render these in their own wire dialect.

pub mod mock;
pub mod rest;

use crate::error::SyncResult;
use crate::query::{Filter, SelectQuery};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use verba_types::{ConflictKey, Record};

pub use rest::{RestConfig, RestRemoteStore};

/// A row the remote store refused during an upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// Index of the row in the submitted batch.
    pub index: usize,
    /// Error reported for the row.
    pub message: String,
}

/// Result of a batch upsert: the call itself succeeded, individual rows may
/// still have been rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub failed: Vec<RowError>,
}

impl UpsertOutcome {
    /// Every row accepted.
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// Indices of rejected rows.
    pub fn failed_indices(&self) -> HashSet<usize> {
        self.failed.iter().map(|e| e.index).collect()
    }
}

/// Shared backend store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns a short name for logs.
    fn name(&self) -> &'static str;

    /// Selects rows from a table or view.
    async fn select(&self, relation: &str, query: &SelectQuery) -> SyncResult<Vec<Record>>;

    /// Inserts or updates rows, matching existing ones on `conflict_key`.
    ///
    /// Stores that report per-row failures return them in the outcome.
    /// Stores that apply a batch atomically fail the whole call instead.
    async fn upsert_batch(
        &self,
        relation: &str,
        rows: Vec<Record>,
        conflict_key: ConflictKey,
    ) -> SyncResult<UpsertOutcome>;

    /// Deletes the rows matching every filter in `key`.
    async fn delete_by_key(&self, relation: &str, key: &[Filter]) -> SyncResult<()>;

    /// Installs (or clears) the session's access token for later requests.
    /// Takes effect before the call returns.
    fn set_access_token(&self, _token: Option<String>) {}
}
