//! Outcome reports returned by the public sync operations.
//!
//! Sync is best-effort background work: operations never fail towards the
//! caller, they report what happened instead.

use serde::Serialize;
use verba_types::{MirrorTable, Table};

/// Why an operation did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No remote backend configured.
    NotConfigured,
    /// Nobody is signed in.
    NoSession,
    /// Another flush is in flight.
    AlreadyFlushing,
}

/// Result of one queue flush.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    /// Mutations acknowledged by the remote.
    pub sent: usize,
    /// Mutations that failed and went back on the queue.
    pub requeued: usize,
    /// Mutations discarded (no conflict key, or secret settings).
    pub dropped: usize,
    /// Mutations superseded by a later one for the same record.
    pub coalesced: usize,
    pub skipped: Option<SkipReason>,
}

impl FlushReport {
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Default::default()
        }
    }
}

/// Per-table result of a full local export push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePush {
    pub table: Table,
    pub pushed: usize,
    pub failed: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub tables: Vec<TablePush>,
    pub skipped: Option<SkipReason>,
}

impl PushReport {
    pub fn pushed(&self) -> usize {
        self.tables.iter().map(|t| t.pushed).sum()
    }
}

/// Per-table result of a pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePull {
    pub table: Table,
    /// Rows returned by the remote.
    pub fetched: usize,
    /// Rows refused by the ownership filter.
    pub rejected: usize,
    /// Rows inserted or replaced locally.
    pub merged: usize,
    /// Rows the local store kept its own version of.
    pub skipped: usize,
    pub error: Option<String>,
}

impl TablePull {
    pub(crate) fn failed(table: Table, error: String) -> Self {
        Self {
            table,
            fetched: 0,
            rejected: 0,
            merged: 0,
            skipped: 0,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PullReport {
    pub tables: Vec<TablePull>,
    pub skipped: Option<SkipReason>,
}

impl PullReport {
    pub fn merged(&self) -> usize {
        self.tables.iter().map(|t| t.merged).sum()
    }

    pub fn table(&self, table: Table) -> Option<&TablePull> {
        self.tables.iter().find(|t| t.table == table)
    }

    pub fn failed_tables(&self) -> Vec<Table> {
        self.tables
            .iter()
            .filter(|t| t.error.is_some())
            .map(|t| t.table)
            .collect()
    }
}

/// Per-mirror result of a shared content import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirrorImport {
    pub mirror: MirrorTable,
    pub fetched: usize,
    pub stored: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub mirrors: Vec<MirrorImport>,
    pub skipped: Option<SkipReason>,
}

/// Result of the session-start sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FullSyncReport {
    pub push: PushReport,
    pub pull: PullReport,
    pub flush: FlushReport,
}
