//! Recoverable conditions collected during a closure resolution.

use serde::Serialize;
use std::fmt;

use crossref_storage::StoreError;

use crate::graph::TableRef;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClosureWarning {
    /// A table query failed; expansion continued without it.
    QueryFailed { table: String, message: String },
    /// A table query exceeded the per-query timeout.
    Timeout { table: String, timeout_ms: u64 },
    /// No name search row in any store matched the seed exactly, so the
    /// unfiltered rows were kept.
    NameFilterFallback {
        tables: Vec<String>,
        seed: String,
        rows: usize,
    },
    /// Expansion stopped at the pass cap with keys still unsearched.
    PassCapReached { passes: usize, unsearched: usize },
    /// Expansion stopped at the deadline with keys still unsearched.
    DeadlineExceeded { elapsed_ms: u64, unsearched: usize },
    /// A concurrent query task ended without a result.
    TaskFailed { message: String },
    /// Nothing matched the seed.
    NoRecords,
}

impl ClosureWarning {
    pub(crate) fn from_store_error(table: &TableRef, error: &StoreError) -> Self {
        match error {
            StoreError::Timeout { timeout_ms, .. } => ClosureWarning::Timeout {
                table: table.to_string(),
                timeout_ms: *timeout_ms,
            },
            other => ClosureWarning::QueryFailed {
                table: table.to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for ClosureWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosureWarning::QueryFailed { table, message } => {
                write!(f, "{}: query failed: {}", table, message)
            }
            ClosureWarning::Timeout { table, timeout_ms } => {
                write!(f, "{}: query timed out after {}ms", table, timeout_ms)
            }
            ClosureWarning::NameFilterFallback { tables, seed, rows } => write!(
                f,
                "{}: no row named exactly '{}'; kept all {} name search result(s)",
                tables.join(", "),
                seed,
                rows
            ),
            ClosureWarning::PassCapReached { passes, unsearched } => write!(
                f,
                "stopped after {} pass(es) with {} key(s) unsearched",
                passes, unsearched
            ),
            ClosureWarning::DeadlineExceeded {
                elapsed_ms,
                unsearched,
            } => write!(
                f,
                "deadline exceeded after {}ms with {} key(s) unsearched",
                elapsed_ms, unsearched
            ),
            ClosureWarning::TaskFailed { message } => write!(f, "query task failed: {}", message),
            ClosureWarning::NoRecords => f.write_str("no records found"),
        }
    }
}
