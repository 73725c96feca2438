//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use verba_types::{MirrorTable, Table};

/// Delay between the last enqueue and the flush it triggers.
pub const DEFAULT_DEBOUNCE_MS: u64 = 2_000;

/// Maximum rows per upsert request.
pub const MAX_BATCH_SIZE: usize = 100;

/// Setting keys that hold credentials and must stay on the device.
pub const DEFAULT_SECRET_SETTING_KEYS: [&str; 5] = [
    "api_key",
    "claude_api_key",
    "openai_api_key",
    "aws_access_key_id",
    "aws_secret_access_key",
];

/// Where a mirror table's shared rows come from on the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedSource {
    /// Local mirror the rows are written to.
    pub mirror: MirrorTable,
    /// Remote relation (table or view) exposing rows shared with the user.
    pub relation: String,
}

impl SharedSource {
    pub fn new(mirror: MirrorTable, relation: impl Into<String>) -> Self {
        Self {
            mirror,
            relation: relation.into(),
        }
    }
}

/// Configuration for the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Debounce window for queued mutations (ms).
    pub debounce_ms: u64,
    /// Deadline for every remote call (ms).
    pub request_timeout_ms: u64,
    /// Maximum rows per upsert request.
    pub batch_size: usize,
    /// Tables pushed and pulled by a full sync.
    pub tables: Vec<Table>,
    /// Tables whose pulls are restricted to rows owned by the current user.
    pub scoped_tables: Vec<Table>,
    /// Setting keys that never leave the device.
    pub secret_setting_keys: Vec<String>,
    /// Per-table columns that never leave the device.
    pub secret_fields: BTreeMap<Table, Vec<String>>,
    /// Remote sources of shared content.
    pub shared_sources: Vec<SharedSource>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            request_timeout_ms: 30_000,
            batch_size: MAX_BATCH_SIZE,
            tables: Table::ALL.to_vec(),
            scoped_tables: vec![Table::TeachingPoints],
            secret_setting_keys: DEFAULT_SECRET_SETTING_KEYS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            secret_fields: BTreeMap::new(),
            shared_sources: MirrorTable::ALL
                .into_iter()
                .map(|m| SharedSource::new(m, m.as_str()))
                .collect(),
        }
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Batch size clamped to at least one row.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}
