//! Shared content import into the local mirrors.

mod common;

use common::*;
use pretty_assertions::assert_eq;
use verba_sync::{Filter, RemoteCall, RemoteStore, SharedSource, SkipReason, SyncConfig};
use verba_types::{MirrorTable, Table};

// ── Import ──────────────────────────────────────────────────────

#[tokio::test]
async fn shared_rows_land_in_the_mirror() {
    let h = harness();
    h.remote.seed(
        "shared_templates",
        [row("s1", "2024-01-01T00:00:00Z").with("user_id", OTHER).with("title", "Referral")],
    );

    let report = h.engine.import_shared_content().await;
    assert_eq!(report.mirrors.len(), 2);
    assert_eq!(report.mirrors[0].stored, 1);

    let mirror = h.local.mirror_rows(MirrorTable::SharedTemplates);
    assert_eq!(mirror.len(), 1);
    assert_eq!(mirror[0].get_str("sharer_id"), Some(OTHER));
    assert!(!mirror[0].contains("user_id"));
    assert!(!mirror[0].contains("id"));
    assert_eq!(mirror[0].get_str("title"), Some("Referral"));
}

#[tokio::test]
async fn import_never_overwrites_own_records() {
    let h = harness();
    h.local.put(
        Table::Templates,
        row("s1", "2024-01-01T00:00:00Z").with("title", "mine"),
    );
    h.remote.seed(
        "shared_templates",
        [row("s1", "2025-01-01T00:00:00Z").with("user_id", OTHER).with("title", "theirs")],
    );

    h.engine.import_shared_content().await;

    let own = h.local.get(Table::Templates, "s1").unwrap();
    assert_eq!(own.get_str("title"), Some("mine"));
    assert_eq!(h.local.rows(Table::Templates).len(), 1);
    assert_eq!(h.local.mirror_rows(MirrorTable::SharedTemplates)[0].get_str("title"), Some("theirs"));
}

#[tokio::test]
async fn own_and_keyless_rows_are_skipped() {
    let h = harness();
    h.remote.seed(
        "shared_teaching_points",
        [
            row("mine", "2024-01-01T00:00:00Z").with("user_id", ME),
            verba_types::Record::new().with("user_id", OTHER).with("body", "no sync id"),
            row("p1", "2024-01-01T00:00:00Z").with("user_id", OTHER),
        ],
    );

    h.engine.import_shared_content().await;
    let mirror = h.local.mirror_rows(MirrorTable::SharedTeachingPoints);
    assert_eq!(mirror.len(), 1);
    assert_eq!(mirror[0].get_str("sync_id"), Some("p1"));
}

#[tokio::test]
async fn selects_exclude_the_current_user() {
    let h = harness();
    h.engine.import_shared_content().await;

    let filters: Vec<(String, Vec<Filter>)> = h
        .remote
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            RemoteCall::Select { relation, query } => Some((relation, query.filters)),
            _ => None,
        })
        .collect();
    assert_eq!(
        filters,
        [
            ("shared_templates".to_string(), vec![Filter::neq("user_id", ME)]),
            ("shared_teaching_points".to_string(), vec![Filter::neq("user_id", ME)]),
        ]
    );
}

#[tokio::test]
async fn unshared_rows_disappear_on_next_import() {
    let h = harness();
    h.remote.seed("shared_templates", [row("s1", "2024-01-01T00:00:00Z").with("user_id", OTHER)]);
    h.engine.import_shared_content().await;
    assert_eq!(h.local.mirror_rows(MirrorTable::SharedTemplates).len(), 1);

    h.remote
        .delete_by_key("shared_templates", &[Filter::eq("sync_id", "s1")])
        .await
        .unwrap();

    h.engine.import_shared_content().await;
    assert!(h.local.mirror_rows(MirrorTable::SharedTemplates).is_empty());
}

// ── Failures ────────────────────────────────────────────────────

#[tokio::test]
async fn failing_source_keeps_its_mirror_and_spares_the_others() {
    let h = harness();
    h.remote.seed("shared_templates", [row("s1", "2024-01-01T00:00:00Z").with("user_id", OTHER)]);
    h.remote.seed("shared_teaching_points", [row("p1", "2024-01-01T00:00:00Z").with("user_id", OTHER)]);
    h.engine.import_shared_content().await;

    h.remote.fail_relation("shared_templates");
    h.remote.seed("shared_teaching_points", [row("p2", "2024-01-01T00:00:00Z").with("user_id", OTHER)]);
    let report = h.engine.import_shared_content().await;

    assert!(report.mirrors[0].error.is_some());
    assert_eq!(h.local.mirror_rows(MirrorTable::SharedTemplates).len(), 1);
    assert_eq!(h.local.mirror_rows(MirrorTable::SharedTeachingPoints).len(), 2);
}

#[tokio::test]
async fn custom_sources_are_honoured() {
    let h = harness_with(SyncConfig {
        shared_sources: vec![SharedSource::new(MirrorTable::SharedTemplates, "public_templates")],
        ..Default::default()
    });
    h.remote.seed("public_templates", [row("s9", "2024-01-01T00:00:00Z").with("user_id", OTHER)]);

    let report = h.engine.import_shared_content().await;
    assert_eq!(report.mirrors.len(), 1);
    assert_eq!(h.local.mirror_rows(MirrorTable::SharedTemplates).len(), 1);
}

#[tokio::test]
async fn signed_out_import_does_nothing() {
    let h = harness();
    h.hub.sign_out();
    let report = h.engine.import_shared_content().await;
    assert_eq!(report.skipped, Some(SkipReason::NoSession));
    assert!(h.remote.calls().is_empty());
}
