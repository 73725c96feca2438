//! Ownership filter: which fields may leave the device and which queries
//! must be scoped to the current user.
//!
//! Every outbound payload passes through [`OwnershipFilter::prepare_outbound`]
//! and every pulled row through [`OwnershipFilter::admit_inbound`]. Callers
//! are not trusted to have removed secrets themselves.

use crate::config::SyncConfig;
use crate::query::Filter;
use std::collections::{HashMap, HashSet};
use verba_types::{Record, Table, UserId};

/// Columns that only have meaning in the local store.
pub const LOCAL_ONLY_FIELDS: [&str; 1] = ["id"];

/// Column naming the owner of a remote row.
pub const OWNER_COLUMN: &str = "user_id";

/// Pure per-table field and scope policy.
#[derive(Debug, Clone)]
pub struct OwnershipFilter {
    secret_setting_keys: HashSet<String>,
    secret_fields: HashMap<Table, HashSet<String>>,
    scoped_tables: HashSet<Table>,
}

impl Default for OwnershipFilter {
    fn default() -> Self {
        Self::new(&SyncConfig::default())
    }
}

impl OwnershipFilter {
    /// Builds the filter from the engine configuration.
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            secret_setting_keys: config.secret_setting_keys.iter().cloned().collect(),
            secret_fields: config
                .secret_fields
                .iter()
                .map(|(t, fields)| (*t, fields.iter().cloned().collect()))
                .collect(),
            scoped_tables: config.scoped_tables.iter().copied().collect(),
        }
    }

    /// Returns true if `field` must never appear in an outbound payload.
    ///
    /// For [`Table::Settings`] the field is the setting's key.
    pub fn is_excluded(&self, table: Table, field: &str) -> bool {
        LOCAL_ONLY_FIELDS.contains(&field) || self.is_secret(table, field)
    }

    /// Returns true for credential-like fields (as opposed to local-only ones).
    pub fn is_secret(&self, table: Table, field: &str) -> bool {
        if table == Table::Settings && self.secret_setting_keys.contains(field) {
            return true;
        }
        self.secret_fields
            .get(&table)
            .is_some_and(|fields| fields.contains(field))
    }

    /// Whether pulls of `table` are restricted to the user's own rows.
    pub fn is_scoped(&self, table: Table) -> bool {
        self.scoped_tables.contains(&table)
    }

    /// Ownership predicate for a pull of `table`, if the table is scoped.
    pub fn scope_filter(&self, table: Table, user_id: &UserId) -> Option<Filter> {
        self.is_scoped(table)
            .then(|| Filter::eq(OWNER_COLUMN, user_id.as_str()))
    }

    /// Returns true if a settings row names a secret key.
    fn is_secret_setting(&self, table: Table, record: &Record) -> bool {
        table == Table::Settings
            && record
                .key()
                .is_some_and(|k| self.secret_setting_keys.contains(k))
    }

    /// Prepares a row for transmission.
    ///
    /// Returns `None` for settings rows holding a secret; otherwise a copy
    /// with every excluded field removed and `user_id` set to the owner.
    pub fn prepare_outbound(&self, table: Table, record: &Record, user_id: &UserId) -> Option<Record> {
        if self.is_secret_setting(table, record) {
            return None;
        }
        let mut out = record.clone();
        out.retain(|field, _| !self.is_excluded(table, field));
        out.insert(OWNER_COLUMN, user_id.as_str());
        Some(out)
    }

    /// Screens a pulled row before it may be merged locally.
    ///
    /// Rows that carry secret values are dropped outright; local-only
    /// columns (the remote's own row id) are stripped.
    pub fn admit_inbound(&self, table: Table, mut record: Record) -> Option<Record> {
        if self.is_secret_setting(table, &record) {
            return None;
        }
        let carries_secret = record
            .as_map()
            .iter()
            .any(|(field, value)| !value.is_null() && self.is_secret(table, field));
        if carries_secret {
            return None;
        }
        record.retain(|field, _| !LOCAL_ONLY_FIELDS.contains(&field));
        Some(record)
    }
}

