use serde::Serialize;
use std::collections::BTreeMap;

use crossref_storage::{MigrationStatus, Record, Source};

use crate::matcher::MatchResult;

/// Migration classification counts over the legacy records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStats {
    /// Legacy records considered.
    pub total: usize,
    pub migrated: usize,
    pub partial: usize,
    pub not_migrated: usize,
    /// No assignment rule exists for this bucket; always zero.
    pub instructions_only: usize,
    /// `migrated / total` as a one-decimal percentage.
    pub migration_rate: String,
    /// Legacy id → current id for every match, exact or fuzzy.
    pub cross_reference_map: BTreeMap<String, String>,
}

impl MigrationStats {
    /// Count statuses of the legacy records in `records` and index `matches`.
    pub fn compute(records: &[Record], matches: &[MatchResult]) -> Self {
        let mut stats = MigrationStats {
            total: 0,
            migrated: 0,
            partial: 0,
            not_migrated: 0,
            instructions_only: 0,
            migration_rate: String::new(),
            cross_reference_map: BTreeMap::new(),
        };

        for record in records.iter().filter(|r| r.source == Source::Legacy) {
            stats.total += 1;
            match record.migration_status {
                MigrationStatus::Migrated => stats.migrated += 1,
                MigrationStatus::Partial => stats.partial += 1,
                MigrationStatus::NotChecked => stats.not_migrated += 1,
            }
        }
        for m in matches {
            // A reused legacy id keeps its first counterpart.
            stats
                .cross_reference_map
                .entry(m.legacy_id.clone())
                .or_insert_with(|| m.current_id.clone());
        }
        stats.migration_rate = format_rate(stats.migrated, stats.total);
        stats
    }
}

/// `part / whole` as a percentage with one decimal; `0/0` is `"0.0%"`.
pub fn format_rate(part: usize, whole: usize) -> String {
    if whole == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", part as f64 * 100.0 / whole as f64)
}
