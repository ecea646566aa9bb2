//! Whole-pipeline reconciliation properties.
//!
//! 1. Output size is bounded and no input record appears twice
//! 2. Identical inputs give identical output
//! 3. Exact foreign-key matches win over fuzzy ones
//! 4. Fuzzy matching never crosses a calendar day
//! 5. Unparsable timestamps never drop a record
//! 6. A dropped duplicate never takes its match with it
//! 7. Downstream report shape

use std::collections::HashSet;

use crossref_reconcile::{reconcile, MatchBasis, ReconcileConfig};
use crossref_storage::{MigrationStatus, Row, Source};
use serde_json::{json, Value};

// ──────────────────────────────────────────────
// Fixtures
// ──────────────────────────────────────────────

fn rows(value: Value) -> Vec<Row> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
}

fn mixed_legacy() -> Vec<Row> {
    rows(json!([
        {"ID": 1, "Email": "ann@x.com", "First_Name": "Ann", "Date_Created": "2024-03-01"},
        {"ID": 2, "Email": "bob@x.com", "First_Name": "Bob", "Date_Created": "2024-03-02"},
        {"ID": 3, "Phone_Number": "0700 111", "Date_Created": "2024-03-03T09:00:00Z"},
        {"ID": 4, "Email": "dee@x.com", "Date_Created": "not a date"},
        {"ID": 2, "Email": "bob@x.com", "First_Name": "Bob", "Date_Created": "2024-03-02"}
    ]))
}

fn mixed_current() -> Vec<Row> {
    rows(json!([
        {"id": 10, "acid": "1", "email": "ann@x.com", "datetime": "2024-03-01T10:00:00Z"},
        {"id": 11, "email": "bob@x.com", "datetime": "2024-03-02T16:30:00"},
        {"id": 12, "phone": "0700 111", "datetime": "2024-03-05"},
        {"id": 13, "email": "new@x.com", "datetime": "2024-03-06"},
        {"id": 14, "email": "dee@x.com", "datetime": "2024-03-04"}
    ]))
}

fn status_of(report: &Value, source: &str, id_field: &str, id: i64) -> String {
    report["enquiries"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["source"] == source && e[id_field] == id)
        .map(|e| e["migrationStatus"].as_str().unwrap().to_string())
        .unwrap_or_else(|| panic!("{source} record {id} missing from output"))
}

// ──────────────────────────────────────────────
// Examples
// ──────────────────────────────────────────────

#[test]
fn example_exact_foreign_key() {
    let outcome = reconcile(
        rows(json!([{"id": "123", "email": "a@x.com", "Date_Created": "2024-01-05"}])),
        rows(json!([{"id": "9", "acid": "123", "email": "a@x.com"}])),
        &ReconcileConfig::default(),
    )
    .unwrap();

    assert_eq!(outcome.unique_records.len(), 1);
    assert_eq!(outcome.unique_records[0].source, Source::Legacy);
    assert_eq!(
        outcome.unique_records[0].migration_status,
        MigrationStatus::Migrated
    );
    assert_eq!(outcome.stats.cross_reference_map.len(), 1);
    assert_eq!(outcome.stats.cross_reference_map["123"], "9");
    assert_eq!(outcome.stats.migration_rate, "100.0%");
}

#[test]
fn example_day_mismatch() {
    let outcome = reconcile(
        rows(json!([{"id": "200", "email": "b@y.com", "Date_Created": "2024-02-01"}])),
        rows(json!([{"id": "77", "email": "b@y.com", "datetime": "2024-02-03"}])),
        &ReconcileConfig::default(),
    )
    .unwrap();

    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.unique_records.len(), 2);
    assert_eq!(
        outcome.unique_records[0].migration_status,
        MigrationStatus::NotChecked
    );
    assert_eq!(outcome.stats.not_migrated, 1);
    assert_eq!(outcome.stats.migration_rate, "0.0%");
}

// ──────────────────────────────────────────────
// Properties
// ──────────────────────────────────────────────

#[test]
fn output_is_bounded_and_free_of_duplicates() {
    let legacy = mixed_legacy();
    let current = mixed_current();
    let bound = legacy.len() + current.len();
    let outcome = reconcile(legacy, current, &ReconcileConfig::default()).unwrap();

    assert!(outcome.unique_records.len() <= bound);

    let mut seen = HashSet::new();
    for record in &outcome.unique_records {
        let key = (record.source, record.id().unwrap());
        assert!(seen.insert(key.clone()), "{key:?} appears twice");
    }

    // Matched current records are excluded.
    for m in &outcome.matches {
        assert!(!seen.contains(&(Source::Current, m.current_id.clone())));
    }
}

#[test]
fn reconcile_is_idempotent() {
    let config = ReconcileConfig::default();
    let first = reconcile(mixed_legacy(), mixed_current(), &config).unwrap();
    let second = reconcile(mixed_legacy(), mixed_current(), &config).unwrap();

    assert_eq!(first.stats, second.stats);
    assert_eq!(first.unique_records, second.unique_records);
    assert_eq!(first.matches, second.matches);
}

#[test]
fn exact_match_takes_precedence_over_fuzzy() {
    // Current 10 carries acid=1 and would also match legacy 1 on email and day.
    let outcome = reconcile(mixed_legacy(), mixed_current(), &ReconcileConfig::default()).unwrap();
    let ann = outcome
        .matches
        .iter()
        .find(|m| m.legacy_id == "1")
        .unwrap();
    assert_eq!(ann.basis, MatchBasis::ExactForeignKey);
    assert_eq!(ann.current_id, "10");
}

#[test]
fn fuzzy_match_stays_within_one_day() {
    let report = reconcile(mixed_legacy(), mixed_current(), &ReconcileConfig::default())
        .unwrap()
        .to_json();

    // Same local day: partial.
    assert_eq!(status_of(&report, "legacy", "ID", 2), "partial");
    // Phone matches but two days apart.
    assert_eq!(status_of(&report, "legacy", "ID", 3), "not-checked");
    assert_eq!(status_of(&report, "current", "id", 12), "not-checked");
}

#[test]
fn unparsable_timestamp_keeps_record() {
    let report = reconcile(mixed_legacy(), mixed_current(), &ReconcileConfig::default())
        .unwrap()
        .to_json();
    assert_eq!(status_of(&report, "legacy", "ID", 4), "not-checked");
    assert_eq!(status_of(&report, "current", "id", 14), "not-checked");
}

#[test]
fn duplicate_keeps_match_of_dropped_copy() {
    // Same id, email and day; only the second copy's phone matches current 90.
    let outcome = reconcile(
        rows(json!([
            {"ID": 7, "Email": "p@x.com", "Phone_Number": "111", "Date_Created": "2024-01-01"},
            {"ID": 7, "Email": "p@x.com", "Phone_Number": "222", "Date_Created": "2024-01-01"}
        ])),
        rows(json!([
            {"id": 90, "email": "q@x.com", "phone": "222", "datetime": "2024-01-01"}
        ])),
        &ReconcileConfig::default(),
    )
    .unwrap();

    assert_eq!(outcome.unique_records.len(), 1);
    assert_eq!(
        outcome.unique_records[0].migration_status,
        MigrationStatus::Partial
    );
    assert_eq!(outcome.stats.partial, 1);
    assert_eq!(outcome.stats.not_migrated, 0);
    assert_eq!(outcome.stats.cross_reference_map["7"], "90");
}

#[test]
fn report_has_downstream_shape() {
    let outcome =
        reconcile(mixed_legacy(), mixed_current(), &ReconcileConfig::default()).unwrap();
    let report = outcome.to_json();

    assert_eq!(report["count"], outcome.unique_records.len());
    assert_eq!(report["sources"]["main"], 5);
    assert_eq!(report["sources"]["instructions"], 5);
    assert_eq!(report["sources"]["unique"], outcome.unique_records.len());

    let migration = &report["migration"];
    for field in [
        "total",
        "migrated",
        "partial",
        "notMigrated",
        "instructionsOnly",
        "migrationRate",
        "crossReferenceMap",
    ] {
        assert!(migration.get(field).is_some(), "missing migration.{field}");
    }
    assert_eq!(migration["instructionsOnly"], 0);
    assert_eq!(migration["crossReferenceMap"]["2"], "11");
}

#[test]
fn text_report_lists_matches() {
    let outcome =
        reconcile(mixed_legacy(), mixed_current(), &ReconcileConfig::default()).unwrap();
    let text = outcome.to_text();
    assert!(text.contains("MATCHES:"));
    assert!(text.contains("1 -> 10 (exact-foreign-key)"));
    assert!(text.contains("2 -> 11 (fuzzy-contact-same-day)"));
}
