//! The closed set of synced tables and their conflict keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A logical table kept in sync with the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    /// Per-user key/value settings.
    Settings,
    /// Analysis history entries.
    History,
    /// Letter templates.
    Templates,
    /// Generated letters.
    Letters,
    /// User-authored teaching points.
    TeachingPoints,
}

impl Table {
    /// Every synced table, in push order.
    pub const ALL: [Table; 5] = [
        Table::Settings,
        Table::History,
        Table::Templates,
        Table::Letters,
        Table::TeachingPoints,
    ];

    /// Returns the table name shared by the local and remote stores.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Table::Settings => "settings",
            Table::History => "history",
            Table::Templates => "templates",
            Table::Letters => "letters",
            Table::TeachingPoints => "teaching_points",
        }
    }

    /// Returns the key used to match a local row with its remote counterpart.
    #[must_use]
    pub const fn conflict_key(&self) -> ConflictKey {
        match self {
            Table::Settings => ConflictKey::UserAndKey,
            _ => ConflictKey::SyncId,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Table::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| crate::Error::UnknownTable(s.to_string()))
    }
}

/// How rows of a table are matched across devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKey {
    /// A single immutable `sync_id` column.
    SyncId,
    /// The owning user plus the setting's `key` (settings are keyed by name).
    UserAndKey,
}

impl ConflictKey {
    /// Columns forming the key on the remote store.
    #[must_use]
    pub const fn remote_columns(&self) -> &'static [&'static str] {
        match self {
            ConflictKey::SyncId => &["sync_id"],
            ConflictKey::UserAndKey => &["user_id", "key"],
        }
    }

    /// The column identifying a row within one user's local store.
    #[must_use]
    pub const fn local_column(&self) -> &'static str {
        match self {
            ConflictKey::SyncId => "sync_id",
            ConflictKey::UserAndKey => "key",
        }
    }
}

/// A local read-only mirror of content shared by other users.
///
/// Mirrors are distinct from the user's own tables so an imported row can
/// never overwrite a record the user owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorTable {
    SharedTemplates,
    SharedTeachingPoints,
}

impl MirrorTable {
    pub const ALL: [MirrorTable; 2] = [MirrorTable::SharedTemplates, MirrorTable::SharedTeachingPoints];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MirrorTable::SharedTemplates => "shared_templates",
            MirrorTable::SharedTeachingPoints => "shared_teaching_points",
        }
    }

    /// The user-owned table whose rows this mirror holds copies of.
    #[must_use]
    pub const fn source(&self) -> Table {
        match self {
            MirrorTable::SharedTemplates => Table::Templates,
            MirrorTable::SharedTeachingPoints => Table::TeachingPoints,
        }
    }
}

impl fmt::Display for MirrorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
