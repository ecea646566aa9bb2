//! Legacy/current reconciliation.
//!
//! Takes the enquiry rows fetched from both stores, decides which rows
//! describe the same entity, and produces one ordered, de-duplicated list
//! with per-record migration classification:
//!
//! 1. Wrap raw rows as [`Record`]s tagged with their source
//! 2. Match legacy ↔ current ([`matcher::match_records`])
//! 3. Merge, suppress matched current rows, de-duplicate ([`merge::merge`])
//! 4. Count migration statistics ([`stats::MigrationStats`])

pub mod config;
pub mod error;
pub mod matcher;
pub mod merge;
pub mod report;
pub mod stats;
pub mod timestamp;

use crossref_storage::{Record, Row, Source};

pub use config::{FieldMap, FieldOverrides, ReconcileConfig};
pub use error::ReconcileError;
pub use matcher::{match_records, MatchBasis, MatchResult};
pub use merge::{merge, DedupKey};
pub use report::{ReconcileReport, SourceCounts};
pub use stats::MigrationStats;

/// Result of reconciling two record sets.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub unique_records: Vec<Record>,
    pub stats: MigrationStats,
    pub matches: Vec<MatchResult>,
    pub sources: SourceCounts,
}

/// Reconcile raw rows from the legacy and current stores.
///
/// Rows are wrapped as records using the configured field maps; the primary
/// key of each record is the first configured id field present in the row.
pub fn reconcile(
    legacy_rows: Vec<Row>,
    current_rows: Vec<Row>,
    config: &ReconcileConfig,
) -> Result<ReconcileOutcome, ReconcileError> {
    config.validate()?;
    let legacy = into_records(legacy_rows, Source::Legacy, &config.legacy);
    let current = into_records(current_rows, Source::Current, &config.current);
    Ok(reconcile_records(legacy, current, config))
}

/// Reconcile records that are already wrapped.
///
/// Running this twice on identical inputs yields identical output.
pub fn reconcile_records(
    legacy: Vec<Record>,
    current: Vec<Record>,
    config: &ReconcileConfig,
) -> ReconcileOutcome {
    let sources = SourceCounts {
        main: legacy.len(),
        instructions: current.len(),
        unique: 0,
    };
    let matches = match_records(&legacy, &current, config);
    let (unique_records, stats) = merge(legacy, current, &matches, config);
    tracing::info!(
        legacy = sources.main,
        current = sources.instructions,
        unique = unique_records.len(),
        matched = matches.len(),
        "reconciled"
    );
    ReconcileOutcome {
        sources: SourceCounts {
            unique: unique_records.len(),
            ..sources
        },
        unique_records,
        stats,
        matches,
    }
}

fn into_records(rows: Vec<Row>, source: Source, fields: &FieldMap) -> Vec<Record> {
    rows.into_iter()
        .map(|row| {
            let pk = fields
                .id
                .iter()
                .find(|f| row.contains_key(f.as_str()))
                .or_else(|| fields.id.first())
                .cloned()
                .unwrap_or_default();
            Record::new(source, &fields.table, &pk, row)
        })
        .collect()
}
