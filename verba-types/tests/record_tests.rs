use pretty_assertions::assert_eq;
use serde_json::json;
use verba_types::{MutationOp, PendingMutation, Record, Table, Timestamp};

// ── Construction ─────────────────────────────────────────────────

#[test]
fn from_value_requires_object() {
    assert!(Record::from_value(json!({"a": 1})).is_ok());
    assert!(matches!(
        Record::from_value(json!([1, 2])),
        Err(verba_types::Error::NotAnObject)
    ));
    assert!(Record::try_from(json!("x")).is_err());
}

#[test]
fn builder_and_accessors() {
    let r = Record::new()
        .with("sync_id", "abc")
        .with("title", "Hello")
        .with("id", 7);
    assert_eq!(r.len(), 3);
    assert_eq!(r.get_str("title"), Some("Hello"));
    assert_eq!(r.sync_id().unwrap().as_str(), "abc");
    assert_eq!(r.local_id(), Some(&json!(7)));
    assert!(r.contains("id"));
}

#[test]
fn serializes_as_plain_object() {
    let r = Record::new().with("key", "theme").with("value", "dark");
    assert_eq!(
        serde_json::to_value(&r).unwrap(),
        json!({"key": "theme", "value": "dark"})
    );
}

#[test]
fn from_iterator() {
    let r: Record = [("a", json!(1)), ("b", json!("two"))].into_iter().collect();
    assert_eq!(r.get("a"), Some(&json!(1)));
    assert_eq!(r.get_str("b"), Some("two"));
}

// ── Sync helpers ─────────────────────────────────────────────────

#[test]
fn empty_sync_id_counts_as_missing() {
    let r = Record::new().with("sync_id", "");
    assert!(r.sync_id().is_none());
    assert!(r.conflict_value(Table::Letters).is_none());
}

#[test]
fn conflict_value_per_table() {
    let setting = Record::new().with("key", "theme").with("sync_id", "ignored");
    assert_eq!(setting.conflict_value(Table::Settings).as_deref(), Some("theme"));

    let letter = Record::new().with("sync_id", "abc").with("key", "ignored");
    assert_eq!(letter.conflict_value(Table::Letters).as_deref(), Some("abc"));

    let numeric = Record::new().with("sync_id", 42);
    assert_eq!(numeric.conflict_value(Table::History).as_deref(), Some("42"));
}

#[test]
fn updated_at_round_trip() {
    let mut r = Record::new();
    assert!(r.updated_at().is_none());
    let ts = Timestamp::from_raw("2024-01-01T00:00:00Z");
    r.set_updated_at(&ts);
    assert_eq!(r.updated_at(), Some(ts));
}

#[test]
fn builtin_accepts_bool_and_integer() {
    assert!(Record::new().with("is_builtin", true).is_builtin());
    assert!(Record::new().with("is_builtin", 1).is_builtin());
    assert!(!Record::new().with("is_builtin", 0).is_builtin());
    assert!(!Record::new().with("is_builtin", false).is_builtin());
    assert!(!Record::new().is_builtin());
}

#[test]
fn retain_and_remove() {
    let mut r = Record::new().with("id", 1).with("sync_id", "s").with("body", "x");
    r.retain(|field, _| field != "id");
    assert!(!r.contains("id"));
    assert_eq!(r.remove("body"), Some(json!("x")));
    assert_eq!(r.fields().collect::<Vec<_>>(), vec!["sync_id"]);
}

// ── PendingMutation ──────────────────────────────────────────────

#[test]
fn pending_mutation_carries_conflict_value() {
    let m = PendingMutation::new(
        Table::Settings,
        MutationOp::Upsert,
        Record::new().with("key", "theme"),
    );
    assert_eq!(m.conflict_value().as_deref(), Some("theme"));
    assert!(Timestamp::parse(m.enqueued_at.as_str()).is_ok());
}

#[test]
fn mutation_op_serde() {
    assert_eq!(serde_json::to_value(MutationOp::Delete).unwrap(), json!("delete"));
}
