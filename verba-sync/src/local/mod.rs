//! Local store abstraction.
//!
//! The engine never touches the on-device database directly. It lists and
//! exports rows, hands pulled rows over for last-write-wins merging, and
//! installs shared content into mirror tables.

pub mod memory;
pub mod sidecar;

use crate::error::SyncResult;
use crate::merge::MergeReport;
use async_trait::async_trait;
use verba_types::{MirrorTable, Record, Table};

pub use memory::MemoryStore;

/// Column holding the owner of a mirrored row.
pub const SHARER_COLUMN: &str = "sharer_id";
pub use sidecar::{SidecarConfig, SidecarStore};

/// The on-device store.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Rows as the application sees them.
    async fn list_all(&self, table: Table) -> SyncResult<Vec<Record>>;

    /// Full export for an initial push, including fields the ownership filter
    /// strips later.
    async fn export_all(&self, table: Table) -> SyncResult<Vec<Record>>;

    /// One row by its local id, if it exists.
    async fn export_record(&self, table: Table, local_id: &str) -> SyncResult<Option<Record>>;

    /// Merges pulled rows with last-write-wins per conflict key
    /// (see [`crate::merge::resolve`]).
    async fn merge_rows(&self, table: Table, rows: Vec<Record>) -> SyncResult<MergeReport>;

    /// Installs the current snapshot of shared rows into a mirror table.
    ///
    /// Rows are inserted or replaced keyed by `(sharer_id, sync_id)`; mirror
    /// rows missing from the snapshot are no longer shared and are removed.
    /// Returns the number of rows now held by the mirror.
    async fn replace_mirror(&self, mirror: MirrorTable, rows: Vec<Record>) -> SyncResult<usize>;
}
