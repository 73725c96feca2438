//! In-memory queue of local mutations not yet acknowledged by the remote.
//!
//! Many producers push; a single flush routine drains. Draining swaps the
//! buffer out under the lock, so a mutation pushed while a flush is running
//! lands in the fresh buffer and is picked up by the next flush, never lost
//! and never sent twice.

use std::sync::{Mutex, MutexGuard};
use verba_types::PendingMutation;

/// Mutex-guarded pending mutation buffer.
#[derive(Debug, Default)]
pub struct MutationQueue {
    items: Mutex<Vec<PendingMutation>>,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PendingMutation>> {
        // A poisoned buffer is still a valid Vec; keep going with it.
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Appends a mutation.
    pub fn push(&self, mutation: PendingMutation) {
        self.lock().push(mutation);
    }

    /// Removes and returns every queued mutation in one step.
    pub fn drain_snapshot(&self) -> Vec<PendingMutation> {
        std::mem::take(&mut *self.lock())
    }

    /// Puts failed mutations back ahead of anything queued since the drain,
    /// keeping their original relative order.
    pub fn requeue(&self, failed: Vec<PendingMutation>) {
        if failed.is_empty() {
            return;
        }
        let mut items = self.lock();
        let newer = std::mem::replace(&mut *items, failed);
        items.extend(newer);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Clones the current contents without draining.
    pub fn snapshot(&self) -> Vec<PendingMutation> {
        self.lock().clone()
    }
}
