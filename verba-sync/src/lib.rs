//! Local/remote sync engine for Verba.
//!
//! Keeps a user's settings, history, templates, letters and teaching points
//! consistent between the on-device store and a shared remote store, and
//! imports content other users share into local read-only mirrors.
//!
//! # Architecture
//!
//! Local writes are committed first and synced after, best-effort:
//!
//! - **Ownership filter**: decides which fields may leave the device and
//!   scopes pulls to the user's own rows
//! - **Mutation queue**: in-memory buffer of unsent local changes
//! - **Push scheduler**: debounces queue activity into batched upserts
//! - **Pull merger**: fetches remote rows and merges them last-write-wins
//! - **Shared importer**: mirrors content shared by other users
//! - **Orchestrator**: runs a full sync when a session starts
//!
//! Storage is reached only through the [`LocalStore`] and [`RemoteStore`]
//! traits. [`SidecarStore`] and [`RestRemoteStore`] are the HTTP adapters;
//! [`MemoryStore`] and [`MockRemoteStore`] are in-process doubles.
//!
//! Sync never fails towards the caller: every public operation returns a
//! report and logs what went wrong through `tracing`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use verba_sync::{MemoryStore, MockRemoteStore, SessionHub, SyncConfig, SyncEngine};
//! use verba_types::{MutationOp, Record, Table, UserId};
//!
//! # async fn demo() -> verba_sync::SyncResult<()> {
//! let hub = SessionHub::new();
//! let engine = SyncEngine::new(
//!     Arc::new(MemoryStore::new()),
//!     Some(Arc::new(MockRemoteStore::new())),
//!     Arc::new(hub.clone()),
//!     SyncConfig::default(),
//! )?;
//! let _watch = engine.watch_session(&hub);
//!
//! hub.sign_in(UserId::new("user-1"), None);
//! engine.enqueue(
//!     Table::Settings,
//!     MutationOp::Upsert,
//!     Record::new().with("key", "theme").with("value", "dark"),
//! );
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod error;
pub mod filter;
pub mod local;
pub mod merge;
mod orchestrator;
mod pull;
mod push;
pub mod query;
mod queue;
pub mod remote;
mod report;
mod scheduler;
pub mod session;
mod shared;

pub use config::{
    SharedSource, SyncConfig, DEFAULT_DEBOUNCE_MS, DEFAULT_SECRET_SETTING_KEYS, MAX_BATCH_SIZE,
};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use filter::OwnershipFilter;
pub use local::{LocalStore, MemoryStore, SidecarConfig, SidecarStore};
pub use merge::{resolve, MergeDecision, MergeReport};
pub use query::{Filter, FilterOp, OrderBy, SelectQuery};
pub use queue::MutationQueue;
pub use remote::mock::{MockRemoteStore, RemoteCall};
pub use remote::{RemoteStore, RestConfig, RestRemoteStore, RowError, UpsertOutcome};
pub use report::{
    FlushReport, FullSyncReport, ImportReport, MirrorImport, PullReport, PushReport, SkipReason,
    TablePull, TablePush,
};
pub use scheduler::SchedulerPhase;
pub use session::{SessionEvent, SessionHub, SessionProvider, Subscription};
