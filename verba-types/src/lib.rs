//! Core type definitions for the Verba sync engine.
//!
//! This crate defines the plugin-free vocabulary shared by every part of
//! the sync layer:
//! - The closed set of synced tables and their conflict keys
//! - Local read-only mirror tables for content shared by other users
//! - Stable cross-device identifiers (`SyncId`) and user identities
//! - ISO-8601 `updated_at` timestamps with a lexicographic total order
//! - Schemaless records and pending mutations
//!
//! Storage engines and network clients live elsewhere; nothing here does I/O.

mod ids;
mod mutation;
mod record;
mod table;
mod timestamp;

pub use ids::{SyncId, UserId};
pub use mutation::{MutationOp, PendingMutation};
pub use record::Record;
pub use table::{ConflictKey, MirrorTable, Table};
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("record is not a JSON object")]
    NotAnObject,
}
