//! Two-hop dependencies through store-internal ids.
//!
//! Some tables can only be reached through an id that never leaves its
//! store. A link describes the hop:
//!
//! ```toml
//! [[links]]
//! store = "current"
//! lookup_table = "Instructions"
//! from_kind = "InstructionRef"
//! intermediate_column = "InternalId"
//! dependent_table = "IdVerifications"
//! dependent_column = "InstructionInternalId"
//! ```
//!
//! When the frontier carries `from_kind` values, `lookup_table` is searched
//! by them, the `intermediate_column` values of the rows found are
//! collected, and `dependent_table` is searched by raw `dependent_column`.

use serde::Deserialize;
use serde_json::Value;
use std::fmt;

use crossref_storage::{value_text, KeyKind, KeyValue, Row, Source};

use crate::error::ClosureError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Link {
    pub store: Source,
    pub lookup_table: String,
    pub from_kind: KeyKind,
    pub intermediate_column: String,
    pub dependent_table: String,
    pub dependent_column: String,
}

impl Link {
    /// Distinct intermediate ids carried by `rows`, in first-seen order.
    pub fn intermediate_values(&self, rows: &[Row]) -> Vec<KeyValue> {
        let mut out: Vec<KeyValue> = Vec::new();
        for row in rows {
            let Some(value) = row.get(&self.intermediate_column).and_then(raw_key_value) else {
                continue;
            };
            if !out.contains(&value) {
                out.push(value);
            }
        }
        out
    }

    pub(crate) fn validate(&self) -> Result<(), ClosureError> {
        let fields = [
            ("lookup_table", &self.lookup_table),
            ("intermediate_column", &self.intermediate_column),
            ("dependent_table", &self.dependent_table),
            ("dependent_column", &self.dependent_column),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ClosureError::Configuration(format!(
                    "link {}: {} is empty",
                    self, name
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}.{}.{} -> {}.{}",
            self.from_kind,
            self.store,
            self.lookup_table,
            self.intermediate_column,
            self.dependent_table,
            self.dependent_column
        )
    }
}

/// A raw column value as a constraint value: integers stay integers,
/// everything else is trimmed text.
fn raw_key_value(raw: &Value) -> Option<KeyValue> {
    if let Some(i) = raw.as_i64() {
        return Some(KeyValue::Int(i));
    }
    value_text(raw).map(KeyValue::Text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn link() -> Link {
        serde_json::from_value(json!({
            "store": "current",
            "lookup_table": "Instructions",
            "from_kind": "InstructionRef",
            "intermediate_column": "InternalId",
            "dependent_table": "IdVerifications",
            "dependent_column": "InstructionInternalId"
        }))
        .unwrap()
    }

    #[test]
    fn intermediate_values_are_distinct() {
        let rows: Vec<Row> = [
            json!({"InternalId": 7}),
            json!({"InternalId": "8"}),
            json!({"InternalId": 7}),
            json!({"InternalId": null}),
            json!({}),
        ]
        .into_iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect();
        assert_eq!(
            link().intermediate_values(&rows),
            vec![KeyValue::Int(7), KeyValue::Text("8".to_string())]
        );
    }

    #[test]
    fn display_shows_both_hops() {
        assert_eq!(
            link().to_string(),
            "InstructionRef -> current.Instructions.InternalId -> IdVerifications.InstructionInternalId"
        );
    }

    #[test]
    fn empty_column_is_rejected() {
        let mut l = link();
        l.intermediate_column = " ".to_string();
        assert!(matches!(l.validate(), Err(ClosureError::Configuration(_))));
    }
}
