//! Sync engine: the handle the application holds.
//!
//! Local mutation sites call [`SyncEngine::enqueue`], which never blocks on
//! I/O. Network work (debounced flushes, pulls, shared imports, full syncs)
//! runs asynchronously on the Tokio runtime captured at construction.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::filter::OwnershipFilter;
use crate::local::LocalStore;
use crate::queue::MutationQueue;
use crate::remote::RemoteStore;
use crate::report::{FlushReport, ImportReport, PullReport, PushReport, SkipReason};
use crate::scheduler::{Scheduler, SchedulerPhase};
use crate::session::SessionProvider;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};
use verba_types::{MutationOp, PendingMutation, Record, Table, UserId};

pub(crate) struct EngineInner {
    pub(crate) config: SyncConfig,
    pub(crate) filter: OwnershipFilter,
    pub(crate) queue: MutationQueue,
    pub(crate) scheduler: Scheduler,
    pub(crate) local: Arc<dyn LocalStore>,
    pub(crate) remote: Option<Arc<dyn RemoteStore>>,
    pub(crate) session: Arc<dyn SessionProvider>,
    pub(crate) runtime: Handle,
}

impl EngineInner {
    /// Remote store and signed-in user, or the reason remote work is skipped.
    pub(crate) fn remote_context(
        &self,
    ) -> Result<(Arc<dyn RemoteStore>, UserId), SkipReason> {
        let remote = self.remote.clone().ok_or(SkipReason::NotConfigured)?;
        let user_id = self.session.current_user_id().ok_or(SkipReason::NoSession)?;
        Ok((remote, user_id))
    }

    /// Runs a remote call under the configured deadline.
    pub(crate) async fn bounded<T>(&self, call: impl Future<Output = SyncResult<T>>) -> SyncResult<T> {
        tokio::time::timeout(self.config.request_timeout(), call)
            .await
            .map_err(|_| SyncError::Timeout)?
    }
}

/// Cheaply cloneable handle to one sync engine instance.
#[derive(Clone)]
pub struct SyncEngine {
    pub(crate) inner: Arc<EngineInner>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("phase", &self.scheduler_phase())
            .field("queued", &self.queue_len())
            .field("remote", &self.inner.remote.as_ref().map(|r| r.name()))
            .finish()
    }
}

impl SyncEngine {
    /// Creates an engine. Must be called from within a Tokio runtime.
    ///
    /// `remote` is `None` when no backend is configured; every remote
    /// operation is then a silent no-op.
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Option<Arc<dyn RemoteStore>>,
        session: Arc<dyn SessionProvider>,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
        let filter = OwnershipFilter::new(&config);
        Ok(Self {
            inner: Arc::new(EngineInner {
                scheduler: Scheduler::new(),
                filter,
                config,
                queue: MutationQueue::new(),
                local,
                remote,
                session,
                runtime,
            }),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Returns the ownership filter in force.
    pub fn filter(&self) -> &OwnershipFilter {
        &self.inner.filter
    }

    /// Current push scheduler phase.
    pub fn scheduler_phase(&self) -> SchedulerPhase {
        self.inner.scheduler.phase()
    }

    /// Number of mutations waiting to be flushed.
    pub fn queue_len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Copy of the queued mutations.
    pub fn pending(&self) -> Vec<PendingMutation> {
        self.inner.queue.snapshot()
    }

    /// Queues a committed local change and (re)arms the debounce timer.
    ///
    /// Settings rows whose key is a secret are dropped silently. Returns
    /// whether the mutation was queued.
    pub fn enqueue(&self, table: Table, op: MutationOp, data: Record) -> bool {
        if table == Table::Settings
            && data.key().is_some_and(|k| self.inner.filter.is_excluded(table, k))
        {
            debug!("Not queueing excluded setting");
            return false;
        }

        self.inner.queue.push(PendingMutation::new(table, op, data));
        self.inner.arm_debounce();
        true
    }

    /// Exports a row by local id and queues it as an upsert.
    pub async fn enqueue_local(&self, table: Table, local_id: &str) -> bool {
        match self.inner.local.export_record(table, local_id).await {
            Ok(Some(record)) => self.enqueue(table, MutationOp::Upsert, record),
            Ok(None) => {
                debug!("No {} row with local id {}; nothing to queue", table, local_id);
                false
            }
            Err(e) => {
                warn!("Failed to export {} row {}: {}", table, local_id, e);
                false
            }
        }
    }

    /// Sends everything currently queued. At most one flush runs at a time;
    /// a call made while another flush is in flight returns immediately.
    pub async fn flush_queued_changes(&self) -> FlushReport {
        self.inner.flush_now().await
    }

    /// Pushes every exportable local row (see [`crate::push`]).
    pub async fn push_all_local(&self) -> PushReport {
        self.inner.push_all_local().await
    }

    /// Pulls and merges every configured table (see [`crate::pull`]).
    pub async fn pull_remote_data(&self) -> PullReport {
        self.inner.pull_remote_data().await
    }

    /// Imports content other users share into the mirror tables.
    pub async fn import_shared_content(&self) -> ImportReport {
        self.inner.import_shared_content().await
    }
}
