//! Last-write-wins resolution between a local row and a pulled remote row.
//!
//! The remote version replaces the local one only when its `updated_at` is
//! strictly later. Equal timestamps keep the local row untouched, which makes
//! merging the same remote state twice a no-op. A row without `updated_at`
//! is older than any timestamped row.

use serde::{Deserialize, Serialize};
use verba_types::Record;

/// Outcome of comparing a remote row against its local counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// No local row shares the conflict key.
    Insert,
    /// The remote row is newer.
    Replace,
    /// The local row is as new or newer.
    Keep,
}

impl MergeDecision {
    /// Whether the local store changes.
    pub fn applies(&self) -> bool {
        !matches!(self, MergeDecision::Keep)
    }
}

/// Decides what happens to `local` when `remote` arrives.
pub fn resolve(local: Option<&Record>, remote: &Record) -> MergeDecision {
    let Some(local) = local else {
        return MergeDecision::Insert;
    };
    match (remote.updated_at(), local.updated_at()) {
        (Some(r), Some(l)) if r.is_after(&l) => MergeDecision::Replace,
        (Some(_), None) => MergeDecision::Replace,
        _ => MergeDecision::Keep,
    }
}

/// Counts reported by a local merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    /// Rows inserted or replaced.
    pub merged: usize,
    /// Rows left alone (older, equal, or malformed).
    pub skipped: usize,
}
