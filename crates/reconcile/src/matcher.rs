//! Legacy ↔ current correspondence.
//!
//! Two passes over the inputs, both in fetch order:
//!
//! 1. **Exact**: a current record whose legacy-reference field names a legacy
//!    id is matched to the first unclaimed legacy record with that id.
//! 2. **Fuzzy**: each remaining legacy record with an email or phone claims the
//!    first remaining current record with the same email (case-insensitive) or
//!    phone, whose timestamp falls on the same local calendar day.
//!
//! A record is claimed at most once. Exact matches are settled before fuzzy
//! matching starts, so a record matched by foreign key is never reconsidered.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use time::Date;
use tracing::debug;

use crossref_storage::{MigrationStatus, Record};

use crate::config::{FieldMap, ReconcileConfig};
use crate::timestamp::local_day;

/// How a match was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchBasis {
    ExactForeignKey,
    FuzzyContactSameDay,
}

impl MatchBasis {
    /// The migration status a legacy record earns from this kind of match.
    pub fn status(&self) -> MigrationStatus {
        match self {
            MatchBasis::ExactForeignKey => MigrationStatus::Migrated,
            MatchBasis::FuzzyContactSameDay => MigrationStatus::Partial,
        }
    }
}

impl fmt::Display for MatchBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchBasis::ExactForeignKey => write!(f, "exact-foreign-key"),
            MatchBasis::FuzzyContactSameDay => write!(f, "fuzzy-contact-same-day"),
        }
    }
}

/// One legacy ↔ current correspondence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub legacy_id: String,
    pub current_id: String,
    pub basis: MatchBasis,
    /// Position of the legacy record in the input slice.
    #[serde(skip)]
    pub legacy_index: usize,
    /// Position of the current record in the input slice.
    #[serde(skip)]
    pub current_index: usize,
}

/// Contact details used for fuzzy matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Contact {
    pub(crate) fn of(record: &Record, fields: &FieldMap) -> Self {
        Contact {
            email: record.first_text(&fields.email).map(|e| e.to_lowercase()),
            phone: record.first_text(&fields.phone),
        }
    }

    fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none()
    }

    fn matches(&self, other: &Contact) -> bool {
        let email = self.email.is_some() && self.email == other.email;
        let phone = self.phone.is_some() && self.phone == other.phone;
        email || phone
    }
}

/// The record's local calendar day, or `None` when its timestamp is missing
/// or unparsable. Such records sit out fuzzy matching.
pub(crate) fn record_day(record: &Record, fields: &FieldMap) -> Option<Date> {
    let raw = record.first_text(&fields.timestamp)?;
    match local_day(&raw) {
        Ok(day) => Some(day),
        Err(e) => {
            debug!(
                source = %record.source,
                id = %record.first_text(&fields.id).unwrap_or_default(),
                "{}; excluded from fuzzy matching",
                e
            );
            None
        }
    }
}

/// Compute legacy ↔ current matches.
pub fn match_records(
    legacy: &[Record],
    current: &[Record],
    config: &ReconcileConfig,
) -> Vec<MatchResult> {
    let mut legacy_claimed = vec![false; legacy.len()];
    let mut current_claimed = vec![false; current.len()];
    let mut matches = Vec::new();

    let legacy_id = |i: usize| legacy[i].first_text(&config.legacy.id).unwrap_or_default();
    let current_id = |i: usize| current[i].first_text(&config.current.id).unwrap_or_default();

    // Pass 1: explicit foreign key. Legacy ids may be reused, so each id maps
    // to every legacy position carrying it.
    let mut by_id: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, record) in legacy.iter().enumerate() {
        if let Some(id) = record.first_text(&config.legacy.id) {
            by_id.entry(id).or_default().push(i);
        }
    }

    for (ci, record) in current.iter().enumerate() {
        let Some(reference) = record.first_text(&config.current.legacy_ref) else {
            continue;
        };
        let target = by_id
            .get(&reference)
            .and_then(|positions| positions.iter().copied().find(|li| !legacy_claimed[*li]));
        let Some(li) = target else {
            debug!(reference = %reference, "legacy reference has no unclaimed legacy record");
            continue;
        };
        legacy_claimed[li] = true;
        current_claimed[ci] = true;
        matches.push(MatchResult {
            legacy_id: reference,
            current_id: current_id(ci),
            basis: MatchBasis::ExactForeignKey,
            legacy_index: li,
            current_index: ci,
        });
    }

    // Pass 2: contact details on the same local day.
    let current_contacts: Vec<Contact> = current
        .iter()
        .map(|r| Contact::of(r, &config.current))
        .collect();
    let current_days: Vec<Option<Date>> = current
        .iter()
        .map(|r| record_day(r, &config.current))
        .collect();

    for (li, record) in legacy.iter().enumerate() {
        if legacy_claimed[li] {
            continue;
        }
        let contact = Contact::of(record, &config.legacy);
        if contact.is_empty() {
            continue;
        }
        let Some(day) = record_day(record, &config.legacy) else {
            continue;
        };

        let candidates: Vec<usize> = (0..current.len())
            .filter(|ci| {
                !current_claimed[*ci]
                    && current_days[*ci] == Some(day)
                    && contact.matches(&current_contacts[*ci])
            })
            .collect();
        let Some(&ci) = candidates.first() else {
            continue;
        };
        if candidates.len() > 1 {
            // First remaining candidate wins; there is no scoring between them.
            debug!(
                legacy_id = %legacy_id(li),
                candidates = candidates.len(),
                "several same-day current records share contact details"
            );
        }

        legacy_claimed[li] = true;
        current_claimed[ci] = true;
        matches.push(MatchResult {
            legacy_id: legacy_id(li),
            current_id: current_id(ci),
            basis: MatchBasis::FuzzyContactSameDay,
            legacy_index: li,
            current_index: ci,
        });
    }

    matches
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crossref_storage::Source;
    use serde_json::json;

    fn legacy(value: serde_json::Value) -> Record {
        Record::new(
            Source::Legacy,
            "enquiries",
            "ID",
            value.as_object().unwrap().clone(),
        )
    }

    fn current(value: serde_json::Value) -> Record {
        Record::new(
            Source::Current,
            "enquiries",
            "id",
            value.as_object().unwrap().clone(),
        )
    }

    #[test]
    fn exact_match_on_legacy_reference() {
        let l = vec![legacy(json!({"ID": 123, "Email": "a@x.com", "Date_Created": "2024-01-05"}))];
        let c = vec![current(json!({"id": 9, "acid": "123", "email": "a@x.com"}))];
        let matches = match_records(&l, &c, &ReconcileConfig::default());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].legacy_id, "123");
        assert_eq!(matches[0].current_id, "9");
        assert_eq!(matches[0].basis, MatchBasis::ExactForeignKey);
    }

    #[test]
    fn fuzzy_match_requires_same_day() {
        let l = vec![legacy(json!({"ID": 200, "Email": "b@y.com", "Date_Created": "2024-02-01"}))];
        let c = vec![current(json!({"id": 77, "email": "B@Y.com", "datetime": "2024-02-03"}))];
        assert!(match_records(&l, &c, &ReconcileConfig::default()).is_empty());

        let c = vec![current(json!({"id": 77, "email": "B@Y.com", "datetime": "2024-02-01 16:20:00"}))];
        let matches = match_records(&l, &c, &ReconcileConfig::default());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].basis, MatchBasis::FuzzyContactSameDay);
    }

    #[test]
    fn fuzzy_match_on_phone_alone() {
        let l = vec![legacy(json!({"ID": 1, "Phone_Number": "07700 900123", "Date_Created": "2024-03-01"}))];
        let c = vec![current(json!({"id": 2, "phone": " 07700 900123 ", "datetime": "2024-03-01T09:00:00Z"}))];
        let matches = match_records(&l, &c, &ReconcileConfig::default());
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn first_remaining_candidate_wins_and_is_claimed_once() {
        let l = vec![
            legacy(json!({"ID": 1, "Email": "same@x.com", "Date_Created": "2024-03-01"})),
            legacy(json!({"ID": 2, "Email": "same@x.com", "Date_Created": "2024-03-01"})),
            legacy(json!({"ID": 3, "Email": "same@x.com", "Date_Created": "2024-03-01"})),
        ];
        let c = vec![
            current(json!({"id": 10, "email": "same@x.com", "datetime": "2024-03-01"})),
            current(json!({"id": 11, "email": "same@x.com", "datetime": "2024-03-01"})),
        ];
        let matches = match_records(&l, &c, &ReconcileConfig::default());
        let pairs: Vec<(&str, &str)> = matches
            .iter()
            .map(|m| (m.legacy_id.as_str(), m.current_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("1", "10"), ("2", "11")]);
    }

    #[test]
    fn exact_match_takes_precedence_over_fuzzy() {
        // Current 20 references legacy 2 explicitly, but also matches legacy 1
        // by email on the same day. Legacy 1 must not steal it.
        let l = vec![
            legacy(json!({"ID": 1, "Email": "c@z.com", "Date_Created": "2024-04-01"})),
            legacy(json!({"ID": 2, "Email": "c@z.com", "Date_Created": "2024-04-01"})),
        ];
        let c = vec![current(
            json!({"id": 20, "acid": 2, "email": "c@z.com", "datetime": "2024-04-01"}),
        )];
        let matches = match_records(&l, &c, &ReconcileConfig::default());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].legacy_id, "2");
        assert_eq!(matches[0].basis, MatchBasis::ExactForeignKey);
    }

    #[test]
    fn reused_legacy_id_claims_next_unclaimed_row() {
        let l = vec![
            legacy(json!({"ID": 7, "Email": "first@x.com"})),
            legacy(json!({"ID": 7, "Email": "second@x.com"})),
        ];
        let c = vec![
            current(json!({"id": 1, "acid": "7"})),
            current(json!({"id": 2, "acid": "7"})),
            current(json!({"id": 3, "acid": "7"})),
        ];
        let matches = match_records(&l, &c, &ReconcileConfig::default());
        let got: Vec<(usize, usize)> = matches
            .iter()
            .map(|m| (m.legacy_index, m.current_index))
            .collect();
        assert_eq!(got, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn unparsable_timestamp_is_excluded_from_fuzzy() {
        let l = vec![legacy(json!({"ID": 5, "Email": "d@x.com", "Date_Created": "not a date"}))];
        let c = vec![current(json!({"id": 6, "email": "d@x.com", "datetime": "2024-01-01"}))];
        assert!(match_records(&l, &c, &ReconcileConfig::default()).is_empty());

        let l = vec![legacy(json!({"ID": 5, "Email": "d@x.com", "Date_Created": "2024-01-01"}))];
        let c = vec![current(json!({"id": 6, "email": "d@x.com"}))];
        assert!(match_records(&l, &c, &ReconcileConfig::default()).is_empty());
    }

    #[test]
    fn no_contact_details_no_fuzzy_match() {
        let l = vec![legacy(json!({"ID": 8, "Email": "", "Date_Created": "2024-01-01"}))];
        let c = vec![current(json!({"id": 9, "email": "", "datetime": "2024-01-01"}))];
        assert!(match_records(&l, &c, &ReconcileConfig::default()).is_empty());
    }
}
