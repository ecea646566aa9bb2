//! Seed classification.
//!
//! A closure starts from whatever the caller has to hand:
//!
//! | Input                 | Seed                                   |
//! |-----------------------|----------------------------------------|
//! | `HLX-500-12`          | InstructionRef + ProspectId + Passcode |
//! | `500`                 | the configured numeric seed kinds      |
//! | `jane@example.com`    | Email                                  |
//! | `DealId:9001,Email:x` | those exact keys                       |
//! | `Jane Smith`          | name search on each primary table      |

use crossref_storage::{Key, KeyKind, KeyValue};

use crate::error::ClosureError;
use crate::keyset::KeySet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seed {
    /// `PREFIX-<prospect id>-<passcode>`.
    Compound {
        reference: String,
        prospect_id: i64,
        passcode: i64,
    },
    Numeric(i64),
    Email(String),
    /// Free text, resolved by name search.
    Name(String),
    Keys(KeySet),
}

impl Seed {
    pub fn classify(input: &str) -> Result<Seed, ClosureError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ClosureError::EmptySeed);
        }

        if let Some(keys) = parse_keys(input)? {
            return Ok(Seed::Keys(keys));
        }
        if let Some(seed) = parse_compound(input) {
            return Ok(seed);
        }
        if input.chars().all(|c| c.is_ascii_digit()) {
            return input
                .parse::<i64>()
                .map(Seed::Numeric)
                .map_err(|e| ClosureError::InvalidSeed {
                    seed: input.to_string(),
                    reason: e.to_string(),
                });
        }
        if let Some(KeyValue::Text(email)) = KeyKind::Email.normalize_str(input) {
            return Ok(Seed::Email(email));
        }
        Ok(Seed::Name(
            input.split_whitespace().collect::<Vec<_>>().join(" "),
        ))
    }

    /// The keys the first pass searches with. Name seeds start empty and
    /// are bootstrapped by name search.
    pub fn initial_keys(&self, numeric_kinds: &[KeyKind]) -> KeySet {
        let mut keys = KeySet::new();
        match self {
            Seed::Compound {
                reference,
                prospect_id,
                passcode,
            } => {
                keys.insert(Key {
                    kind: KeyKind::InstructionRef,
                    value: KeyValue::Text(reference.clone()),
                });
                keys.insert(Key {
                    kind: KeyKind::ProspectId,
                    value: KeyValue::Int(*prospect_id),
                });
                keys.insert(Key {
                    kind: KeyKind::Passcode,
                    value: KeyValue::Int(*passcode),
                });
            }
            Seed::Numeric(n) => {
                for kind in numeric_kinds {
                    keys.insert(Key {
                        kind: *kind,
                        value: KeyValue::Int(*n),
                    });
                }
            }
            Seed::Email(email) => {
                keys.insert(Key {
                    kind: KeyKind::Email,
                    value: KeyValue::Text(email.clone()),
                });
            }
            Seed::Name(_) => {}
            Seed::Keys(set) => keys.extend(set.iter()),
        }
        keys
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Seed::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// `Kind:value[,Kind:value...]`. Returns `None` when the input is not in
/// that form at all, and an error when it is but a part does not parse.
fn parse_keys(input: &str) -> Result<Option<KeySet>, ClosureError> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    let looks_like_keys = parts.iter().all(|p| {
        p.split_once(':')
            .is_some_and(|(kind, _)| kind.parse::<KeyKind>().is_ok())
    });
    if !looks_like_keys {
        return Ok(None);
    }
    let mut keys = KeySet::new();
    for part in parts {
        let key: Key = part.parse().map_err(|e: crossref_storage::KeyParseError| {
            ClosureError::InvalidSeed {
                seed: input.to_string(),
                reason: e.to_string(),
            }
        })?;
        keys.insert(key);
    }
    Ok(Some(keys))
}

fn parse_compound(input: &str) -> Option<Seed> {
    let mut parts = input.split('-');
    let (prefix, first, second) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    if !digits(first) || !digits(second) {
        return None;
    }
    Some(Seed::Compound {
        reference: input.to_uppercase(),
        prospect_id: first.parse().ok()?,
        passcode: second.parse().ok()?,
    })
}
