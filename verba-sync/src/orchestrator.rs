//! Session-start orchestration: full sync and session wiring.

use crate::engine::SyncEngine;
use crate::report::FullSyncReport;
use crate::session::{SessionEvent, SessionHub, Subscription};
use std::sync::Arc;
use tracing::{debug, info};

impl SyncEngine {
    /// Pushes every local row, pulls every table, then flushes whatever was
    /// queued meanwhile. Each step is best-effort.
    pub async fn full_sync(&self) -> FullSyncReport {
        info!("Starting full sync");
        let push = self.push_all_local().await;
        let pull = self.pull_remote_data().await;
        let flush = self.flush_queued_changes().await;
        info!(
            "Full sync done: pushed {}, merged {}, flushed {}",
            push.pushed(),
            pull.merged(),
            flush.sent
        );
        FullSyncReport { push, pull, flush }
    }

    /// Runs a full sync and a shared content import whenever a session
    /// starts on `hub`.
    ///
    /// Sign-out only clears the remote access token; queued mutations stay
    /// in memory and go out after the next sign-in. The access token is
    /// installed on the notifying thread before the callback returns. The
    /// engine is held weakly, so the subscription does not keep it alive.
    #[must_use = "dropping the subscription stops session-triggered syncs"]
    pub fn watch_session(&self, hub: &SessionHub) -> Subscription {
        let engine = Arc::downgrade(&self.inner);
        hub.subscribe(move |event: &SessionEvent| {
            let Some(inner) = engine.upgrade() else {
                return;
            };
            // Token changes apply in transition order, before any spawn.
            if let Some(remote) = &inner.remote {
                remote.set_access_token(event.access_token().map(str::to_string));
            }
            if !event.establishes_session() {
                debug!("Session ended; keeping {} queued mutations", inner.queue.len());
                return;
            }

            let runtime = inner.runtime.clone();
            runtime.spawn(async move {
                let engine = SyncEngine { inner };
                engine.full_sync().await;
                engine.import_shared_content().await;
            });
        })
    }
}
