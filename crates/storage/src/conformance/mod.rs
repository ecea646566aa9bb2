//! Conformance test suite for `StoreAdapter` implementations.
//!
//! A backend-agnostic set of checks that any adapter can run to verify it
//! honours the contract the closure engine relies on:
//!
//! - **Unknown tables**: reported as `StoreError::UnknownTable`
//! - **Not applicable**: a kind the table cannot resolve yields
//!   `QueryOutcome::NotApplicable`, never an error
//! - **Empty results**: a resolvable kind with no matching value yields an
//!   empty row list
//! - **Normalization**: raw, un-normalized probe input finds the row
//! - **Row shape**: returned rows carry the table's primary key and satisfy
//!   the predicate
//!
//! # Usage
//!
//! ```ignore
//! use crossref_storage::conformance::{run_conformance_suite, Probe};
//!
//! #[tokio::test]
//! async fn sql_store_conformance() {
//!     let store = connect_test_store().await;
//!     let probe = Probe::new("enquiries", KeyKind::Email, " Jane@Example.com ");
//!     let report = run_conformance_suite(&store, &probe).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod query;

use std::fmt;

use crate::key::KeyKind;
use crate::StoreAdapter;

/// A value known to exist in the store, used to check positive queries.
#[derive(Debug, Clone)]
pub struct Probe {
    pub table: String,
    pub kind: KeyKind,
    /// Raw input, exactly as a user might type it.
    pub raw_value: String,
}

impl Probe {
    pub fn new(table: &str, kind: KeyKind, raw_value: &str) -> Self {
        Probe {
            table: table.to_string(),
            kind,
            raw_value: raw_value.to_string(),
        }
    }
}

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "errors", "resolution", "probe").
    pub category: String,
    /// Test name (e.g. "unknown_table_is_error").
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a store adapter.
///
/// The suite only reads; it never mutates the store.
pub async fn run_conformance_suite<S: StoreAdapter>(store: &S, probe: &Probe) -> ConformanceReport {
    let mut results = Vec::new();

    results.extend(query::run_error_tests(store).await);
    results.extend(query::run_resolution_tests(store).await);
    results.extend(query::run_probe_tests(store, probe).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, Source};
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::from_json(
            Source::Legacy,
            json!({
                "tables": {
                    "enquiries": {
                        "primary_key": "ID",
                        "columns": {"ProspectId": "ID"},
                        "name_columns": {"first": "First_Name", "last": "Last_Name"},
                        "rows": [
                            {"ID": 1, "Email": "jane@example.com", "First_Name": "Jane", "Last_Name": "Smith"}
                        ]
                    },
                    "matters": {
                        "primary_key": "Matter_ID",
                        "rows": [{"Matter_ID": "M-1", "ProspectId": 1}]
                    }
                }
            }),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn memory_store_passes() {
        let probe = Probe::new("enquiries", KeyKind::Email, "  JANE@example.COM ");
        let report = run_conformance_suite(&store(), &probe).await;
        assert_eq!(report.failed, 0, "{report}");
        assert!(report.total >= 6);
    }

    #[tokio::test]
    async fn missing_probe_value_fails() {
        let probe = Probe::new("enquiries", KeyKind::Email, "nobody@example.com");
        let report = run_conformance_suite(&store(), &probe).await;
        assert!(report.failed > 0);
        assert!(report.to_string().contains("probe_finds_rows"));
    }
}
