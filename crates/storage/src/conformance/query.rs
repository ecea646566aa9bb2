use super::{Probe, TestResult};
use crate::key::{Key, KeyKind, KeyValue};
use crate::{Predicate, QueryOutcome, StoreAdapter, StoreError};

const MISSING_TABLE: &str = "__crossref_conformance_missing__";

pub(super) async fn run_error_tests<S: StoreAdapter>(store: &S) -> Vec<TestResult> {
    vec![
        TestResult::from_result(
            "errors",
            "unknown_table_is_error",
            unknown_table_is_error(store).await,
        ),
        TestResult::from_result(
            "errors",
            "name_search_without_name_columns_not_applicable",
            name_search_without_name_columns(store).await,
        ),
    ]
}

pub(super) async fn run_resolution_tests<S: StoreAdapter>(store: &S) -> Vec<TestResult> {
    vec![
        TestResult::from_result(
            "resolution",
            "unresolved_kind_not_applicable",
            unresolved_kind_not_applicable(store).await,
        ),
        TestResult::from_result(
            "resolution",
            "resolved_kinds_return_empty_rows",
            resolved_kinds_return_empty_rows(store).await,
        ),
    ]
}

pub(super) async fn run_probe_tests<S: StoreAdapter>(store: &S, probe: &Probe) -> Vec<TestResult> {
    let found = probe_rows(store, probe).await;
    vec![
        TestResult::from_result(
            "probe",
            "probe_finds_rows",
            found.as_ref().map(|_| ()).map_err(Clone::clone),
        ),
        TestResult::from_result(
            "probe",
            "rows_carry_primary_key",
            found
                .as_ref()
                .map_err(Clone::clone)
                .and_then(|rows| rows_carry_primary_key(store, probe, rows)),
        ),
        TestResult::from_result(
            "probe",
            "rows_satisfy_predicate",
            found
                .as_ref()
                .map_err(Clone::clone)
                .and_then(|rows| rows_satisfy_predicate(store, probe, rows)),
        ),
    ]
}

// ── 1. Unknown tables are errors, not empty results ──────────────────────────

async fn unknown_table_is_error<S: StoreAdapter>(store: &S) -> Result<(), String> {
    let result = store
        .query(
            MISSING_TABLE,
            &Predicate::kind_in(KeyKind::ProspectId, vec![KeyValue::Int(1)]),
        )
        .await;
    match result {
        Err(StoreError::UnknownTable { table, .. }) if table == MISSING_TABLE => Ok(()),
        other => Err(format!("expected UnknownTable, got {:?}", other)),
    }
}

// ── 2. Name search on a table without name columns ───────────────────────────

async fn name_search_without_name_columns<S: StoreAdapter>(store: &S) -> Result<(), String> {
    for table in store.tables().iter().filter(|t| t.name_columns.is_none()) {
        match store.query(&table.name, &Predicate::name("conformance")).await {
            Ok(QueryOutcome::NotApplicable { .. }) => {}
            other => {
                return Err(format!(
                    "{}: expected NotApplicable for name search, got {:?}",
                    table.name, other
                ))
            }
        }
    }
    Ok(())
}

// ── 3. Kinds the table cannot resolve are NotApplicable ──────────────────────

async fn unresolved_kind_not_applicable<S: StoreAdapter>(store: &S) -> Result<(), String> {
    for table in store.tables() {
        let missing = KeyKind::ALL
            .into_iter()
            .find(|k| table.resolver.resolve(*k).is_none());
        let Some(kind) = missing else { continue };
        let predicate = Predicate::kind_in(kind, vec![impossible_value(kind)]);
        match store.query(&table.name, &predicate).await {
            Ok(QueryOutcome::NotApplicable { .. }) => {}
            other => {
                return Err(format!(
                    "{}: expected NotApplicable for {}, got {:?}",
                    table.name, kind, other
                ))
            }
        }
    }
    Ok(())
}

// ── 4. Resolvable kinds with no match return an empty row list ───────────────

async fn resolved_kinds_return_empty_rows<S: StoreAdapter>(store: &S) -> Result<(), String> {
    for table in store.tables() {
        for kind in table.resolver.kinds() {
            let predicate = Predicate::kind_in(kind, vec![impossible_value(kind)]);
            match store.query(&table.name, &predicate).await {
                Ok(QueryOutcome::Rows(rows)) if rows.is_empty() => {}
                other => {
                    return Err(format!(
                        "{}: expected no rows for impossible {}, got {:?}",
                        table.name, kind, other
                    ))
                }
            }
        }
    }
    Ok(())
}

// ── 5-7. Probe value ─────────────────────────────────────────────────────────

async fn probe_rows<S: StoreAdapter>(
    store: &S,
    probe: &Probe,
) -> Result<Vec<crate::Row>, String> {
    let key = Key::new(probe.kind, &probe.raw_value)
        .ok_or_else(|| format!("probe value '{}' is not a valid {}", probe.raw_value, probe.kind))?;
    let predicate = Predicate::kind_in(key.kind, vec![key.value]);
    match store.query(&probe.table, &predicate).await {
        Ok(QueryOutcome::Rows(rows)) if !rows.is_empty() => Ok(rows),
        other => Err(format!(
            "expected rows for {} = '{}' in {}, got {:?}",
            probe.kind, probe.raw_value, probe.table, other
        )),
    }
}

fn rows_carry_primary_key<S: StoreAdapter>(
    store: &S,
    probe: &Probe,
    rows: &[crate::Row],
) -> Result<(), String> {
    let table = store
        .table(&probe.table)
        .ok_or_else(|| format!("{} missing from tables()", probe.table))?;
    match rows.iter().find(|r| !r.contains_key(&table.primary_key)) {
        Some(row) => Err(format!(
            "row without primary key '{}': {:?}",
            table.primary_key, row
        )),
        None => Ok(()),
    }
}

fn rows_satisfy_predicate<S: StoreAdapter>(
    store: &S,
    probe: &Probe,
    rows: &[crate::Row],
) -> Result<(), String> {
    let table = store
        .table(&probe.table)
        .ok_or_else(|| format!("{} missing from tables()", probe.table))?;
    let column = table
        .resolver
        .resolve(probe.kind)
        .ok_or_else(|| format!("{} does not resolve {}", probe.table, probe.kind))?;
    let wanted = probe.kind.normalize_str(&probe.raw_value);
    for row in rows {
        let got = row.get(column).and_then(|v| probe.kind.normalize(v));
        if got != wanted {
            return Err(format!(
                "row {:?} does not satisfy {} = {:?}",
                row, probe.kind, wanted
            ));
        }
    }
    Ok(())
}

fn impossible_value(kind: KeyKind) -> KeyValue {
    if kind.is_numeric() {
        KeyValue::Int(i64::MIN)
    } else {
        KeyValue::Text("__crossref_conformance_no_such_value__".to_string())
    }
}
