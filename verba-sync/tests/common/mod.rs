//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use verba_sync::{MemoryStore, MockRemoteStore, SessionHub, SyncConfig, SyncEngine};
use verba_types::{Record, UserId};

pub const ME: &str = "user-1";
pub const OTHER: &str = "user-2";

/// Engine wired to in-memory stores, plus handles to inspect them.
pub struct Harness {
    pub engine: SyncEngine,
    pub local: Arc<MemoryStore>,
    pub remote: Arc<MockRemoteStore>,
    pub hub: SessionHub,
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds an engine with `config`; the hub starts signed in as [`ME`].
pub fn harness_with(config: SyncConfig) -> Harness {
    init_tracing();
    let local = Arc::new(MemoryStore::new());
    let remote = Arc::new(MockRemoteStore::new());
    let hub = SessionHub::new();
    hub.sign_in(UserId::new(ME), None);
    let engine = SyncEngine::new(
        local.clone(),
        Some(remote.clone()),
        Arc::new(hub.clone()),
        config,
    )
    .expect("engine");
    Harness {
        engine,
        local,
        remote,
        hub,
    }
}

pub fn harness() -> Harness {
    harness_with(SyncConfig::default())
}

pub fn me() -> UserId {
    UserId::new(ME)
}

/// A synced row with a fixed timestamp.
pub fn row(sync_id: &str, updated_at: &str) -> Record {
    Record::new()
        .with("sync_id", sync_id)
        .with("updated_at", updated_at)
}

pub fn setting(key: &str, value: &str) -> Record {
    Record::new()
        .with("key", key)
        .with("value", value)
        .with("updated_at", "2024-01-01T00:00:00Z")
}

/// Waits past one debounce window.
pub async fn settle(config: &SyncConfig) {
    tokio::time::sleep(config.debounce() + Duration::from_millis(500)).await;
}
