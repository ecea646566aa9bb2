//! Record accumulation and the finished closure.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crossref_storage::Record;

use crate::graph::TableRef;
use crate::keyset::KeySet;
use crate::warning::ClosureWarning;

// ──────────────────────────────────────────────
// RecordAggregator
// ──────────────────────────────────────────────

/// Collects records per table, dropping repeats.
///
/// A record repeats when its table already holds one with the same primary
/// key value. Records without a primary key value repeat only when the
/// whole row is equal.
#[derive(Debug, Default)]
pub struct RecordAggregator {
    tables: BTreeMap<TableRef, Vec<Record>>,
    seen: HashSet<(TableRef, Identity)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Identity {
    PrimaryKey(String),
    Row(String),
}

impl Identity {
    fn of(record: &Record) -> Self {
        match record.id() {
            Some(id) => Identity::PrimaryKey(id),
            // Map keys are sorted, so equal rows serialize identically.
            None => Identity::Row(Value::Object(record.fields.clone()).to_string()),
        }
    }
}

impl RecordAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records, keeping insertion order. Returns how many were new.
    pub fn collect(&mut self, records: impl IntoIterator<Item = Record>) -> usize {
        let mut added = 0;
        for record in records {
            let table = TableRef::new(record.source, &record.table);
            if !self.seen.insert((table.clone(), Identity::of(&record))) {
                continue;
            }
            self.tables.entry(table).or_default().push(record);
            added += 1;
        }
        added
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_tables(self) -> BTreeMap<TableRef, Vec<Record>> {
        self.tables
    }
}

// ──────────────────────────────────────────────
// EntityClosure
// ──────────────────────────────────────────────

/// Why an expansion stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// A pass found no new keys.
    Fixpoint,
    PassCap,
    Deadline,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Fixpoint => write!(f, "fixpoint"),
            Termination::PassCap => write!(f, "pass cap"),
            Termination::Deadline => write!(f, "deadline"),
        }
    }
}

/// Everything reachable from one seed.
#[derive(Debug, Clone)]
pub struct EntityClosure {
    pub seed: String,
    pub keys: KeySet,
    /// Records by qualified table name.
    pub tables: BTreeMap<TableRef, Vec<Record>>,
    pub warnings: Vec<ClosureWarning>,
    pub passes: usize,
    pub termination: Termination,
}

impl EntityClosure {
    pub fn record_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Records of one table, by qualified name (`legacy.enquiries`).
    pub fn records(&self, qualified: &str) -> &[Record] {
        self.tables
            .iter()
            .find(|(t, _)| t.to_string() == qualified)
            .map(|(_, records)| records.as_slice())
            .unwrap_or(&[])
    }

    pub fn to_json(&self) -> Value {
        let tables: serde_json::Map<String, Value> = self
            .tables
            .iter()
            .map(|(table, records)| {
                (
                    table.to_string(),
                    Value::Array(records.iter().map(|r| Value::Object(r.fields.clone())).collect()),
                )
            })
            .collect();
        json!({
            "seed": self.seed,
            "keys": self.keys.to_json(),
            "tables": tables,
            "recordCount": self.record_count(),
            "passes": self.passes,
            "termination": self.termination,
            "warnings": self.warnings,
        })
    }

    /// Format as a structured text dump.
    pub fn to_text(&self) -> String {
        let mut lines = vec![format!(
            "Closure for '{}': {} key(s), {} record(s) in {} table(s) after {} pass(es) ({})",
            self.seed,
            self.keys.len(),
            self.record_count(),
            self.tables.len(),
            self.passes,
            self.termination
        )];
        lines.push(String::new());

        lines.push("KEYS:".to_string());
        for kind in self.keys.kinds() {
            let values: Vec<String> = self.keys.values(kind).map(|v| v.to_string()).collect();
            lines.push(format!("  {}: {}", kind, values.join(", ")));
        }

        for (table, records) in &self.tables {
            lines.push(String::new());
            lines.push(format!("{} ({}):", table, records.len()));
            for record in records {
                let fields: Vec<String> = record
                    .fields
                    .iter()
                    .map(|(k, v)| match v {
                        Value::String(s) => format!("{}={}", k, s),
                        other => format!("{}={}", k, other),
                    })
                    .collect();
                lines.push(format!("  {}", fields.join(" ")));
            }
        }

        if !self.warnings.is_empty() {
            lines.push(String::new());
            lines.push("WARNINGS:".to_string());
            for w in &self.warnings {
                lines.push(format!("  ! {}", w));
            }
        }

        lines.join("\n")
    }
}
