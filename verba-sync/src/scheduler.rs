//! Push scheduler: debounces queue activity into single flushes.
//!
//! ```text
//! Idle ──enqueue──▶ Scheduled ──timer──▶ Flushing ──queue empty──▶ Idle
//!                    ▲   │ enqueue: cancel + restart        │
//!                    │   ▼                                  │
//!                    └───────────── queue non-empty ◀───────┘
//! ```
//!
//! The timer is a task handle owned by the scheduler state; re-arming aborts
//! the old task and spawns a new one. Each arm bumps a generation counter so
//! a timer that already woke up when it was cancelled finds itself stale and
//! does nothing. Enqueues during `Flushing` do not arm a timer: the running
//! flush re-checks the queue when it completes.

use crate::engine::EngineInner;
use crate::report::{FlushReport, SkipReason};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::debug;

/// Where the scheduler currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Nothing pending.
    Idle,
    /// A debounce timer is armed.
    Scheduled,
    /// A flush is in flight.
    Flushing,
}

#[derive(Debug)]
pub(crate) struct SchedulerState {
    phase: SchedulerPhase,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

#[derive(Debug)]
pub(crate) struct Scheduler {
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SchedulerState {
                phase: SchedulerPhase::Idle,
                timer: None,
                generation: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn phase(&self) -> SchedulerPhase {
        self.lock().phase
    }
}

impl EngineInner {
    /// Called after every enqueue.
    pub(crate) fn arm_debounce(self: &Arc<Self>) {
        let mut state = self.scheduler.lock();
        if state.phase == SchedulerPhase::Flushing {
            return;
        }
        self.arm_locked(&mut state);
    }

    fn arm_locked(self: &Arc<Self>, state: &mut SchedulerState) {
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation += 1;
        let generation = state.generation;
        let delay = self.config.debounce();
        let engine = Arc::downgrade(self);

        state.timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(engine) = engine.upgrade() {
                engine.on_timer(generation).await;
            }
        }));
        state.phase = SchedulerPhase::Scheduled;
    }

    async fn on_timer(self: &Arc<Self>, generation: u64) {
        {
            let mut state = self.scheduler.lock();
            if state.generation != generation || state.phase != SchedulerPhase::Scheduled {
                debug!("Debounce timer {} is stale; ignoring", generation);
                return;
            }
            state.phase = SchedulerPhase::Flushing;
            // Detach our own handle so nothing can abort a running flush.
            state.timer = None;
        }
        self.run_flush().await;
    }

    /// Flushes immediately, superseding any armed timer.
    pub(crate) async fn flush_now(self: &Arc<Self>) -> FlushReport {
        {
            let mut state = self.scheduler.lock();
            if state.phase == SchedulerPhase::Flushing {
                debug!("Flush already in flight");
                return FlushReport::skipped(SkipReason::AlreadyFlushing);
            }
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.generation += 1;
            state.phase = SchedulerPhase::Flushing;
        }
        self.run_flush().await
    }

    /// Body of a flush; leaves the scheduler `Idle` or re-armed.
    async fn run_flush(self: &Arc<Self>) -> FlushReport {
        let report = self.flush_snapshot().await;

        let mut state = self.scheduler.lock();
        let retry = report.skipped.is_none() && !self.queue.is_empty();
        if retry {
            debug!("{} mutations left after flush; re-arming", self.queue.len());
            self.arm_locked(&mut state);
        } else {
            state.phase = SchedulerPhase::Idle;
        }
        report
    }
}
