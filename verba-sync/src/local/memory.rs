//! In-process local store.
//!
//! Holds every table and mirror in memory. Used as the reference
//! implementation of the merge rules and as the local test double.

use super::{LocalStore, SHARER_COLUMN};
use crate::error::{SyncError, SyncResult};
use crate::merge::{resolve, MergeDecision, MergeReport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use verba_types::{MirrorTable, Record, SyncId, Table, Timestamp};

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<Table, Vec<Record>>,
    mirrors: HashMap<MirrorTable, Vec<Record>>,
    next_id: i64,
    failing: HashSet<Table>,
}

impl MemoryState {
    fn find(&self, table: Table, conflict_value: &str) -> Option<usize> {
        self.tables.get(&table)?.iter().position(|r| {
            r.conflict_value(table).as_deref() == Some(conflict_value)
        })
    }
}

/// In-memory [`LocalStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

fn local_id_matches(record: &Record, local_id: &str) -> bool {
    match record.local_id() {
        Some(Value::String(s)) => s == local_id,
        Some(Value::Number(n)) => n.to_string() == local_id,
        _ => false,
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, table: Table) -> SyncResult<()> {
        if self.lock().failing.contains(&table) {
            return Err(SyncError::Storage(format!("{table} is unavailable")));
        }
        Ok(())
    }

    /// Writes a row as a local mutation would: assigns a local id, a sync id
    /// (non-settings tables) and `updated_at` when absent, and replaces any
    /// row with the same conflict key. Returns the stored row.
    pub fn put(&self, table: Table, mut record: Record) -> Record {
        let mut state = self.lock();
        if table != Table::Settings && record.sync_id().is_none() {
            record.insert("sync_id", SyncId::new().to_string());
        }
        if record.updated_at().is_none() {
            record.set_updated_at(&Timestamp::now());
        }

        let existing = record
            .conflict_value(table)
            .and_then(|v| state.find(table, &v));
        match existing {
            Some(pos) => {
                let rows = state.tables.entry(table).or_default();
                if let Some(id) = rows[pos].local_id().cloned() {
                    record.insert("id", id);
                }
                rows[pos] = record.clone();
            }
            None => {
                state.next_id += 1;
                if record.local_id().is_none() {
                    record.insert("id", state.next_id);
                }
                state.tables.entry(table).or_default().push(record.clone());
            }
        }
        record
    }

    /// Removes a row by conflict value. Returns the removed row.
    pub fn remove(&self, table: Table, conflict_value: &str) -> Option<Record> {
        let mut state = self.lock();
        let pos = state.find(table, conflict_value)?;
        state.tables.get_mut(&table).map(|rows| rows.remove(pos))
    }

    /// Looks up a row by conflict value.
    pub fn get(&self, table: Table, conflict_value: &str) -> Option<Record> {
        let state = self.lock();
        let pos = state.find(table, conflict_value)?;
        state.tables.get(&table).map(|rows| rows[pos].clone())
    }

    /// All rows of a table.
    pub fn rows(&self, table: Table) -> Vec<Record> {
        self.lock().tables.get(&table).cloned().unwrap_or_default()
    }

    /// All rows of a mirror table.
    pub fn mirror_rows(&self, mirror: MirrorTable) -> Vec<Record> {
        self.lock().mirrors.get(&mirror).cloned().unwrap_or_default()
    }

    /// Makes every operation on `table` fail until [`MemoryStore::heal`].
    pub fn fail_table(&self, table: Table) {
        self.lock().failing.insert(table);
    }

    pub fn heal(&self, table: Table) {
        self.lock().failing.remove(&table);
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn list_all(&self, table: Table) -> SyncResult<Vec<Record>> {
        self.check(table)?;
        Ok(self.rows(table))
    }

    async fn export_all(&self, table: Table) -> SyncResult<Vec<Record>> {
        self.check(table)?;
        Ok(self.rows(table))
    }

    async fn export_record(&self, table: Table, local_id: &str) -> SyncResult<Option<Record>> {
        self.check(table)?;
        Ok(self
            .lock()
            .tables
            .get(&table)
            .and_then(|rows| rows.iter().find(|r| local_id_matches(r, local_id)).cloned()))
    }

    async fn merge_rows(&self, table: Table, rows: Vec<Record>) -> SyncResult<MergeReport> {
        self.check(table)?;
        let mut state = self.lock();
        let mut report = MergeReport::default();

        for remote in rows {
            let Some(key) = remote.conflict_value(table) else {
                report.skipped += 1;
                continue;
            };
            let pos = state.find(table, &key);
            let local = pos.and_then(|p| state.tables.get(&table).map(|rows| &rows[p]));

            match (resolve(local, &remote), pos) {
                (MergeDecision::Replace, Some(p)) => {
                    let rows = state.tables.entry(table).or_default();
                    let mut merged = remote;
                    if let Some(id) = rows[p].local_id().cloned() {
                        merged.insert("id", id);
                    }
                    rows[p] = merged;
                    report.merged += 1;
                }
                (MergeDecision::Insert, _) => {
                    state.next_id += 1;
                    let mut inserted = remote;
                    inserted.insert("id", state.next_id);
                    state.tables.entry(table).or_default().push(inserted);
                    report.merged += 1;
                }
                _ => report.skipped += 1,
            }
        }

        debug!(
            "Merged {} rows into {} ({} skipped)",
            report.merged, table, report.skipped
        );
        Ok(report)
    }

    async fn replace_mirror(&self, mirror: MirrorTable, rows: Vec<Record>) -> SyncResult<usize> {
        self.check(mirror.source())?;
        let mut snapshot: Vec<Record> = Vec::with_capacity(rows.len());
        for row in rows {
            let key = (row.get_str(SHARER_COLUMN).map(str::to_string), row.sync_id());
            if key.0.is_none() || key.1.is_none() {
                continue;
            }
            match snapshot
                .iter_mut()
                .find(|r| (r.get_str(SHARER_COLUMN).map(str::to_string), r.sync_id()) == key)
            {
                Some(existing) => *existing = row,
                None => snapshot.push(row),
            }
        }

        let count = snapshot.len();
        self.lock().mirrors.insert(mirror, snapshot);
        Ok(count)
    }
}
