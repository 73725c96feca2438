//! Schemaless table rows.

use crate::{SyncId, Table, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single row: field name → JSON value.
///
/// Every row carries `updated_at`; rows that have been synced at least once
/// also carry their conflict key (`sync_id`, or `key` for settings).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Converts a JSON value into a record. Only objects are accepted.
    pub fn from_value(value: Value) -> crate::Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(crate::Error::NotAnObject),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns a string field, if present and a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Iterates over field names.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Keeps only the fields for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &Value) -> bool) {
        self.0.retain(|k, v| keep(k, v));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The row's `updated_at`, if it has one.
    pub fn updated_at(&self) -> Option<Timestamp> {
        self.get_str("updated_at").map(Timestamp::from_raw)
    }

    pub fn set_updated_at(&mut self, ts: &Timestamp) {
        self.0.insert("updated_at".into(), Value::String(ts.as_str().to_string()));
    }

    /// The row's `sync_id`, if it has been assigned one.
    pub fn sync_id(&self) -> Option<SyncId> {
        self.get_str("sync_id")
            .filter(|s| !s.is_empty())
            .map(SyncId::from)
    }

    /// The setting name of a settings row.
    pub fn key(&self) -> Option<&str> {
        self.get_str("key")
    }

    pub fn user_id(&self) -> Option<&str> {
        self.get_str("user_id")
    }

    /// The local row id (never transmitted).
    pub fn local_id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    /// Value of the column that identifies this row within one user's data.
    pub fn conflict_value(&self, table: Table) -> Option<String> {
        match self.get(table.conflict_key().local_column())? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Whether the row is shipped with the application rather than authored
    /// by the user. Accepts `true` or a non-zero integer (SQLite booleans).
    pub fn is_builtin(&self) -> bool {
        match self.0.get("is_builtin") {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().is_some_and(|v| v != 0),
            _ => false,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = crate::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
