use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use verba_sync::{Filter, OwnershipFilter, SyncConfig};
use verba_types::{Record, Table, UserId};

fn me() -> UserId {
    UserId::new("user-1")
}

fn filter_with_secret_field() -> OwnershipFilter {
    let mut config = SyncConfig::default();
    config
        .secret_fields
        .insert(Table::Letters, vec!["recipient_email".to_string()]);
    OwnershipFilter::new(&config)
}

// ── is_excluded ─────────────────────────────────────────────────

#[test]
fn local_id_is_excluded_everywhere() {
    let filter = OwnershipFilter::default();
    for table in Table::ALL {
        assert!(filter.is_excluded(table, "id"));
        assert!(!filter.is_excluded(table, "updated_at"));
    }
}

#[test]
fn secret_setting_keys_are_excluded() {
    let filter = OwnershipFilter::default();
    for key in ["api_key", "claude_api_key", "openai_api_key", "aws_secret_access_key"] {
        assert!(filter.is_excluded(Table::Settings, key), "{key}");
        assert!(filter.is_secret(Table::Settings, key));
    }
    assert!(!filter.is_excluded(Table::Settings, "theme"));
    // Setting key names mean nothing for other tables.
    assert!(!filter.is_excluded(Table::Letters, "api_key"));
}

#[test]
fn configured_secret_fields_are_excluded() {
    let filter = filter_with_secret_field();
    assert!(filter.is_excluded(Table::Letters, "recipient_email"));
    assert!(!filter.is_excluded(Table::History, "recipient_email"));
}

// ── scope_filter ────────────────────────────────────────────────

#[test]
fn teaching_points_are_scoped_by_default() {
    let filter = OwnershipFilter::default();
    assert_eq!(
        filter.scope_filter(Table::TeachingPoints, &me()),
        Some(Filter::eq("user_id", "user-1"))
    );
    assert_eq!(filter.scope_filter(Table::Letters, &me()), None);
}

#[test]
fn scoped_tables_follow_configuration() {
    let config = SyncConfig {
        scoped_tables: vec![Table::Letters, Table::History],
        ..Default::default()
    };
    let filter = OwnershipFilter::new(&config);
    assert!(filter.is_scoped(Table::Letters));
    assert!(filter.is_scoped(Table::History));
    assert!(!filter.is_scoped(Table::TeachingPoints));
}

// ── prepare_outbound ────────────────────────────────────────────

#[test]
fn outbound_strips_local_id_and_stamps_owner() {
    let filter = OwnershipFilter::default();
    let record = Record::new()
        .with("id", 12)
        .with("sync_id", "abc")
        .with("user_id", "someone-else")
        .with("body", "Dear ...");

    let out = filter.prepare_outbound(Table::Letters, &record, &me()).unwrap();
    assert_eq!(
        out.into_value(),
        json!({"sync_id": "abc", "user_id": "user-1", "body": "Dear ..."})
    );
}

#[test]
fn outbound_drops_secret_settings() {
    let filter = OwnershipFilter::default();
    let record = Record::new().with("key", "openai_api_key").with("value", "sk-...");
    assert!(filter.prepare_outbound(Table::Settings, &record, &me()).is_none());

    let harmless = Record::new().with("key", "theme").with("value", "dark");
    assert!(filter.prepare_outbound(Table::Settings, &harmless, &me()).is_some());
}

#[test]
fn outbound_strips_secret_fields() {
    let filter = filter_with_secret_field();
    let record = Record::new()
        .with("sync_id", "abc")
        .with("recipient_email", "a@b.c");
    let out = filter.prepare_outbound(Table::Letters, &record, &me()).unwrap();
    assert!(!out.contains("recipient_email"));
}

// ── admit_inbound ───────────────────────────────────────────────

#[test]
fn inbound_strips_remote_row_id() {
    let filter = OwnershipFilter::default();
    let row = Record::new().with("id", 99).with("sync_id", "abc");
    let admitted = filter.admit_inbound(Table::Letters, row).unwrap();
    assert!(!admitted.contains("id"));
    assert_eq!(admitted.get_str("sync_id"), Some("abc"));
}

#[test]
fn inbound_rejects_secret_settings() {
    let filter = OwnershipFilter::default();
    let row = Record::new().with("key", "api_key").with("value", "leaked");
    assert!(filter.admit_inbound(Table::Settings, row).is_none());
}

#[test]
fn inbound_rejects_rows_carrying_secret_values() {
    let filter = filter_with_secret_field();
    let leaked = Record::new().with("sync_id", "a").with("recipient_email", "x@y.z");
    assert!(filter.admit_inbound(Table::Letters, leaked).is_none());

    let null = Record::new()
        .with("sync_id", "a")
        .with("recipient_email", serde_json::Value::Null);
    assert!(filter.admit_inbound(Table::Letters, null).is_some());
}

// ── Properties ──────────────────────────────────────────────────

fn field_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("id".to_string()),
        Just("recipient_email".to_string()),
        Just("sync_id".to_string()),
        Just("body".to_string()),
        "[a-z_]{1,12}",
    ]
}

fn table_strategy() -> impl Strategy<Value = Table> {
    prop::sample::select(Table::ALL.to_vec())
}

proptest! {
    /// Nothing excluded survives the outbound choke point.
    #[test]
    fn outbound_never_carries_excluded_fields(
        table in table_strategy(),
        fields in prop::collection::vec((field_strategy(), "[a-z0-9]{0,8}"), 0..12),
        key in prop_oneof![Just("api_key".to_string()), Just("theme".to_string()), "[a-z_]{1,10}"],
    ) {
        let filter = filter_with_secret_field();
        let mut record: Record = fields.into_iter().collect();
        record.insert("key", key);

        if let Some(out) = filter.prepare_outbound(table, &record, &me()) {
            for field in out.fields() {
                prop_assert!(!filter.is_excluded(table, field), "{} leaked", field);
            }
            if table == Table::Settings {
                prop_assert!(!filter.is_secret(table, out.key().unwrap()));
            }
            prop_assert_eq!(out.user_id(), Some("user-1"));
        } else {
            prop_assert_eq!(table, Table::Settings);
        }
    }

    /// Admitted rows never carry local-only columns.
    #[test]
    fn inbound_never_carries_local_ids(
        table in table_strategy(),
        fields in prop::collection::vec((field_strategy(), "[a-z0-9]{0,8}"), 0..12),
    ) {
        let filter = OwnershipFilter::default();
        let record: Record = fields.into_iter().collect();
        if let Some(admitted) = filter.admit_inbound(table, record) {
            prop_assert!(!admitted.contains("id"));
        }
    }
}
