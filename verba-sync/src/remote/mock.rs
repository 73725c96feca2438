//! An in-memory remote store for testing.
//!
//! Behaves like a keyed table store, records every call, and can be told to
//! reject specific rows or whole relations to exercise retry paths.

use super::{RemoteStore, RowError, UpsertOutcome};
use crate::error::{SyncError, SyncResult};
use crate::query::{Filter, SelectQuery};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use verba_types::{ConflictKey, Record};

/// A call observed by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Select {
        relation: String,
        query: SelectQuery,
    },
    Upsert {
        relation: String,
        rows: Vec<Record>,
        conflict_key: ConflictKey,
    },
    Delete {
        relation: String,
        key: Vec<Filter>,
    },
}

#[derive(Debug, Default)]
struct MockState {
    relations: HashMap<String, Vec<Record>>,
    calls: Vec<RemoteCall>,
    failing_keys: HashSet<String>,
    failing_relations: HashSet<String>,
    delay: Option<Duration>,
    atomic_batches: bool,
    next_id: u64,
    access_token: Option<String>,
}

/// Recording in-memory [`RemoteStore`].
#[derive(Debug, Default)]
pub struct MockRemoteStore {
    state: Mutex<MockState>,
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn key_of(row: &Record, conflict_key: ConflictKey) -> Vec<Option<String>> {
    conflict_key
        .remote_columns()
        .iter()
        .map(|c| row.get(c).map(render))
        .collect()
}

impl MockRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds rows to a relation as if another device had written them.
    pub fn seed(&self, relation: &str, rows: impl IntoIterator<Item = Record>) {
        let mut state = self.lock();
        for mut row in rows {
            state.next_id += 1;
            if !row.contains("id") {
                row.insert("id", state.next_id);
            }
            state.relations.entry(relation.to_string()).or_default().push(row);
        }
    }

    /// Current contents of a relation.
    pub fn rows(&self, relation: &str) -> Vec<Record> {
        self.lock().relations.get(relation).cloned().unwrap_or_default()
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Only the upsert calls, as `(relation, rows)`.
    pub fn upsert_calls(&self) -> Vec<(String, Vec<Record>)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RemoteCall::Upsert { relation, rows, .. } => Some((relation.clone(), rows.clone())),
                _ => None,
            })
            .collect()
    }

    /// Only the delete calls, as `(relation, key)`.
    pub fn delete_calls(&self) -> Vec<(String, Vec<Filter>)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RemoteCall::Delete { relation, key } => Some((relation.clone(), key.clone())),
                _ => None,
            })
            .collect()
    }

    /// Calls that write (upsert or delete).
    pub fn write_call_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| !matches!(c, RemoteCall::Select { .. }))
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Rejects upserted rows whose conflict value (last key column) equals `value`.
    pub fn fail_key(&self, value: &str) {
        self.lock().failing_keys.insert(value.to_string());
    }

    pub fn heal_key(&self, value: &str) {
        self.lock().failing_keys.remove(value);
    }

    /// Makes every call against `relation` fail with a 503.
    pub fn fail_relation(&self, relation: &str) {
        self.lock().failing_relations.insert(relation.to_string());
    }

    pub fn heal_relation(&self, relation: &str) {
        self.lock().failing_relations.remove(relation);
    }

    /// Delays every call, e.g. to trip request timeouts.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.lock().delay = delay;
    }

    /// Fails a whole upsert with a 400 when any of its rows is rejected,
    /// storing none of them.
    pub fn set_atomic_batches(&self, atomic: bool) {
        self.lock().atomic_batches = atomic;
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock().access_token.clone()
    }

    async fn begin(&self, call: RemoteCall, relation: &str) -> SyncResult<()> {
        let delay = {
            let mut state = self.lock();
            state.calls.push(call);
            if state.failing_relations.contains(relation) {
                return Err(SyncError::Remote {
                    status: 503,
                    message: format!("{relation} unavailable"),
                });
            }
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MockRemoteStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn select(&self, relation: &str, query: &SelectQuery) -> SyncResult<Vec<Record>> {
        self.begin(
            RemoteCall::Select {
                relation: relation.to_string(),
                query: query.clone(),
            },
            relation,
        )
        .await?;

        let state = self.lock();
        let mut rows: Vec<Record> = state
            .relations
            .get(relation)
            .map(|rows| {
                rows.iter()
                    .filter(|r| query.filters.iter().all(|f| f.matches(r)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order_by {
            rows.sort_by(|a, b| {
                let av = a.get(&order.column).map(render);
                let bv = b.get(&order.column).map(render);
                if order.descending { bv.cmp(&av) } else { av.cmp(&bv) }
            });
        }
        Ok(rows)
    }

    async fn upsert_batch(
        &self,
        relation: &str,
        rows: Vec<Record>,
        conflict_key: ConflictKey,
    ) -> SyncResult<UpsertOutcome> {
        self.begin(
            RemoteCall::Upsert {
                relation: relation.to_string(),
                rows: rows.clone(),
                conflict_key,
            },
            relation,
        )
        .await?;

        let mut state = self.lock();
        let mut outcome = UpsertOutcome::ok();
        let mut accepted = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            let key = key_of(&row, conflict_key);
            let last = key.last().cloned().flatten().unwrap_or_default();
            let message = if key.iter().any(Option::is_none) {
                "missing conflict key".to_string()
            } else if state.failing_keys.contains(&last) {
                format!("row {last} rejected")
            } else {
                accepted.push((key, row));
                continue;
            };
            outcome.failed.push(RowError { index, message });
        }

        if state.atomic_batches && !outcome.is_ok() {
            let message = outcome
                .failed
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SyncError::Remote {
                status: 400,
                message,
            });
        }

        for (key, row) in accepted {
            state.next_id += 1;
            let next_id = state.next_id;
            let table = state.relations.entry(relation.to_string()).or_default();
            match table.iter_mut().find(|r| key_of(r, conflict_key) == key) {
                Some(existing) => {
                    let id = existing.get("id").cloned();
                    *existing = row;
                    if let Some(id) = id {
                        existing.insert("id", id);
                    }
                }
                None => {
                    let mut row = row;
                    row.insert("id", next_id);
                    table.push(row);
                }
            }
        }
        Ok(outcome)
    }

    async fn delete_by_key(&self, relation: &str, key: &[Filter]) -> SyncResult<()> {
        self.begin(
            RemoteCall::Delete {
                relation: relation.to_string(),
                key: key.to_vec(),
            },
            relation,
        )
        .await?;

        let mut state = self.lock();
        if let Some(rows) = state.relations.get_mut(relation) {
            rows.retain(|r| !key.iter().all(|f| f.matches(r)));
        }
        Ok(())
    }

    fn set_access_token(&self, token: Option<String>) {
        self.lock().access_token = token;
    }
}
