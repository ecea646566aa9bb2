//! Combine legacy and current records into one ordered, de-duplicated list.

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use crossref_storage::{Record, Source};

use crate::config::{FieldMap, ReconcileConfig};
use crate::matcher::{record_day, Contact, MatchResult};
use crate::stats::MigrationStats;

/// Identity used for final de-duplication.
///
/// Legacy ids are reused across distinct people, so the id alone is never
/// enough: two rows are the same record only when source, id, contact,
/// name and day all agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub source: Source,
    pub id: String,
    pub contact: String,
    pub name: String,
    pub date: String,
}

impl DedupKey {
    pub fn of(record: &Record, fields: &FieldMap) -> Self {
        let contact = Contact::of(record, fields);
        let first = record.first_text(&fields.first_name).unwrap_or_default();
        let last = record.first_text(&fields.last_name).unwrap_or_default();
        // An unparsable timestamp still identifies the row by its raw text.
        let date = match record_day(record, fields) {
            Some(day) => day.to_string(),
            None => record.first_text(&fields.timestamp).unwrap_or_default(),
        };
        DedupKey {
            source: record.source,
            id: record.first_text(&fields.id).unwrap_or_default(),
            contact: contact.email.or(contact.phone).unwrap_or_default(),
            name: normalize_name(&format!("{} {}", first, last)),
            date,
        }
    }
}

/// Lower-case and collapse whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Apply match classifications and build the output list.
///
/// Output order is every legacy record (fetch order) followed by every
/// current record without a legacy counterpart (fetch order). Matched
/// current records are suppressed: the legacy row stands for both.
pub fn merge(
    mut legacy: Vec<Record>,
    current: Vec<Record>,
    matches: &[MatchResult],
    config: &ReconcileConfig,
) -> (Vec<Record>, MigrationStats) {
    let mut suppressed = BTreeSet::new();
    for m in matches {
        if let Some(record) = legacy.get_mut(m.legacy_index) {
            record.migration_status.advance(m.basis.status());
        }
        suppressed.insert(m.current_index);
    }

    let mut kept: HashMap<DedupKey, usize> = HashMap::new();
    let mut out: Vec<Record> = Vec::with_capacity(legacy.len() + current.len());
    let sides = legacy
        .into_iter()
        .map(|r| (r, &config.legacy))
        .chain(
            current
                .into_iter()
                .enumerate()
                .filter(|(i, _)| !suppressed.contains(i))
                .map(|(_, r)| (r, &config.current)),
        );

    for (record, fields) in sides {
        match kept.entry(DedupKey::of(&record, fields)) {
            // The kept row stands for the dropped one, including its match.
            Entry::Occupied(slot) => {
                out[*slot.get()]
                    .migration_status
                    .advance(record.migration_status);
            }
            Entry::Vacant(slot) => {
                slot.insert(out.len());
                out.push(record);
            }
        }
    }

    let stats = MigrationStats::compute(&out, matches);
    (out, stats)
}
