//! Local mutations waiting to be sent to the remote store.

use crate::{Record, Table, Timestamp};
use serde::{Deserialize, Serialize};

/// What a pending mutation does to the remote row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOp {
    Upsert,
    Delete,
}

/// A committed local change that has not yet been acknowledged remotely.
///
/// Lives only in memory: unsent mutations are lost on process exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMutation {
    /// Table the change belongs to.
    pub table: Table,
    /// Upsert or delete.
    pub op: MutationOp,
    /// Full row for upserts; at least the conflict key for deletes.
    pub payload: Record,
    /// When the mutation was queued.
    pub enqueued_at: Timestamp,
}

impl PendingMutation {
    /// Creates a mutation stamped with the current time.
    pub fn new(table: Table, op: MutationOp, payload: Record) -> Self {
        Self {
            table,
            op,
            payload,
            enqueued_at: Timestamp::now(),
        }
    }

    /// Value of the payload's conflict key, if present.
    pub fn conflict_value(&self) -> Option<String> {
        self.payload.conflict_value(self.table)
    }
}
