use std::fmt;

use crate::key::{KeyKind, KeyValue};

/// What a constraint is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Whichever column the table's resolver maps to this kind.
    Kind(KeyKind),
    /// A physical column, addressed directly. Used for store-internal
    /// cross-reference ids that have no cross-store kind.
    Column(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Kind(kind) => write!(f, "{}", kind),
            Target::Column(column) => write!(f, "column '{}'", column),
        }
    }
}

/// `target IN (values)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub target: Target,
    pub values: Vec<KeyValue>,
}

/// A query predicate handed to a [`StoreAdapter`](crate::StoreAdapter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Every constraint must hold (SQL `WHERE a IN (..) AND b IN (..)`).
    AllOf(Vec<Constraint>),
    /// Every token appears in the row's first or last name.
    NameMatch { tokens: Vec<String> },
}

impl Predicate {
    /// Rows whose `kind` column holds any of `values`.
    pub fn kind_in(kind: KeyKind, values: Vec<KeyValue>) -> Self {
        Predicate::AllOf(vec![Constraint {
            target: Target::Kind(kind),
            values,
        }])
    }

    /// Rows whose raw `column` holds any of `values`.
    pub fn column_in(column: &str, values: Vec<KeyValue>) -> Self {
        Predicate::AllOf(vec![Constraint {
            target: Target::Column(column.to_string()),
            values,
        }])
    }

    /// Name search from free text. Tokens are whitespace-split and
    /// lower-cased.
    pub fn name(text: &str) -> Self {
        Predicate::NameMatch {
            tokens: text.split_whitespace().map(str::to_lowercase).collect(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::AllOf(constraints) => {
                let parts: Vec<String> = constraints
                    .iter()
                    .map(|c| {
                        let values: Vec<String> = c.values.iter().map(|v| v.to_string()).collect();
                        format!("{} IN ({})", c.target, values.join(", "))
                    })
                    .collect();
                f.write_str(&parts.join(" AND "))
            }
            Predicate::NameMatch { tokens } => write!(f, "name ~ '{}'", tokens.join(" ")),
        }
    }
}
