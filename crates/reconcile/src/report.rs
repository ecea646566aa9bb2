//! Rendering of reconciliation results.

use serde::Serialize;
use serde_json::Value;

use crate::stats::MigrationStats;
use crate::ReconcileOutcome;

/// Row counts before and after reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceCounts {
    /// Legacy rows in.
    pub main: usize,
    /// Current rows in.
    pub instructions: usize,
    /// Records out.
    pub unique: usize,
}

/// The JSON shape consumed downstream.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub enquiries: Vec<Value>,
    pub count: usize,
    pub sources: SourceCounts,
    pub migration: MigrationStats,
}

impl ReconcileOutcome {
    pub fn to_report(&self) -> ReconcileReport {
        ReconcileReport {
            enquiries: self
                .unique_records
                .iter()
                .map(|r| r.to_output_json())
                .collect(),
            count: self.unique_records.len(),
            sources: self.sources,
            migration: self.stats.clone(),
        }
    }

    /// Serialize the downstream report to JSON.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.to_report()).unwrap_or(Value::Null)
    }

    /// Format as human-readable text.
    pub fn to_text(&self) -> String {
        let s = &self.stats;
        let mut lines = vec![
            format!(
                "{} unique record(s) from {} legacy + {} current",
                self.sources.unique, self.sources.main, self.sources.instructions
            ),
            format!(
                "Migration: {} migrated, {} partial, {} not migrated of {} ({})",
                s.migrated, s.partial, s.not_migrated, s.total, s.migration_rate
            ),
        ];

        if !self.matches.is_empty() {
            lines.push(String::new());
            lines.push("MATCHES:".to_string());
            for m in &self.matches {
                lines.push(format!("  {} -> {} ({})", m.legacy_id, m.current_id, m.basis));
            }
        }

        lines.push(String::new());
        lines.push("RECORDS:".to_string());
        for r in &self.unique_records {
            lines.push(format!(
                "  [{}] {} {}",
                r.source,
                r.id().unwrap_or_else(|| "?".to_string()),
                r.migration_status
            ));
        }

        lines.join("\n")
    }
}
