use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use verba_types::Timestamp;

// ── Construction ─────────────────────────────────────────────────

#[test]
fn now_is_canonical_utc() {
    let ts = Timestamp::now();
    assert!(ts.as_str().ends_with('Z'));
    assert_eq!(ts.as_str().len(), "2024-01-01T00:00:00Z".len());
    assert!(Timestamp::parse(ts.as_str()).is_ok());
}

#[test]
fn from_datetime_renders_seconds() {
    let dt = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 5).unwrap();
    assert_eq!(Timestamp::from_datetime(dt).as_str(), "2024-06-01T12:30:05Z");
}

#[test]
fn parse_keeps_original_text() {
    let ts = Timestamp::parse("2024-01-01T00:00:00.123+00:00").unwrap();
    assert_eq!(ts.as_str(), "2024-01-01T00:00:00.123+00:00");
}

#[test]
fn parse_rejects_invalid() {
    assert!(Timestamp::parse("yesterday").is_err());
    assert!("2024-13-01T00:00:00Z".parse::<Timestamp>().is_err());
}

#[test]
fn from_raw_skips_validation() {
    assert_eq!(Timestamp::from_raw("whenever").as_str(), "whenever");
}

// ── Ordering ─────────────────────────────────────────────────────

#[test]
fn later_timestamp_is_after() {
    let a = Timestamp::from_raw("2024-01-01T00:00:00Z");
    let b = Timestamp::from_raw("2024-06-01T00:00:00Z");
    assert!(b.is_after(&a));
    assert!(!a.is_after(&b));
    assert!(a < b);
}

#[test]
fn equal_timestamps_are_not_after() {
    let a = Timestamp::from_raw("2024-01-01T00:00:00Z");
    let b = a.clone();
    assert_eq!(a, b);
    assert!(!a.is_after(&b));
    assert!(!b.is_after(&a));
}

#[test]
fn ordering_is_lexicographic() {
    let mut stamps = vec![
        Timestamp::from_raw("2024-06-01T00:00:00Z"),
        Timestamp::from_raw("2023-12-31T23:59:59Z"),
        Timestamp::from_raw("2024-01-01T00:00:00Z"),
    ];
    stamps.sort();
    let texts: Vec<&str> = stamps.iter().map(Timestamp::as_str).collect();
    assert_eq!(
        texts,
        ["2023-12-31T23:59:59Z", "2024-01-01T00:00:00Z", "2024-06-01T00:00:00Z"]
    );
}

#[test]
fn serde_transparent() {
    let ts = Timestamp::from_raw("2024-01-01T00:00:00Z");
    let json = serde_json::to_string(&ts).unwrap();
    assert_eq!(json, "\"2024-01-01T00:00:00Z\"");
    let back: Timestamp = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ts);
}

proptest! {
    /// Canonical renderings order the same way as the instants they encode.
    #[test]
    fn canonical_order_matches_chronology(a in 0i64..4_000_000_000, b in 0i64..4_000_000_000) {
        let ta = Timestamp::from_datetime(Utc.timestamp_opt(a, 0).unwrap());
        let tb = Timestamp::from_datetime(Utc.timestamp_opt(b, 0).unwrap());
        prop_assert_eq!(ta.cmp(&tb), a.cmp(&b));
        prop_assert_eq!(ta.is_after(&tb), a > b);
    }
}
