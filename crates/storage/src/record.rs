use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An open field bag as returned by a store query.
pub type Row = serde_json::Map<String, Value>;

/// Which of the two stores a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Legacy,
    Current,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Legacy => "legacy",
            Source::Current => "current",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How (if at all) a record's counterpart in the other store was found.
///
/// Variants are declared in transition order: a status may only move to a
/// later variant, never back.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationStatus {
    /// No counterpart found. Neutral, not an error.
    #[default]
    NotChecked,
    /// Counterpart inferred from contact details on the same day.
    Partial,
    /// Counterpart carries an explicit reference to this record.
    Migrated,
}

impl MigrationStatus {
    /// Move forward to `next`. Returns `false` (and leaves the status alone)
    /// when `next` would be a step backward or no change.
    pub fn advance(&mut self, next: MigrationStatus) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStatus::NotChecked => "not-checked",
            MigrationStatus::Partial => "partial",
            MigrationStatus::Migrated => "migrated",
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row tagged with where it came from and how to identify it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub source: Source,
    pub table: String,
    /// Name of the primary-key field inside `fields`.
    pub primary_key: String,
    pub fields: Row,
    pub migration_status: MigrationStatus,
}

impl Record {
    pub fn new(source: Source, table: &str, primary_key: &str, fields: Row) -> Self {
        Record {
            source,
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            fields,
            migration_status: MigrationStatus::NotChecked,
        }
    }

    /// The primary-key value as text, if present and non-empty.
    pub fn id(&self) -> Option<String> {
        self.text(&self.primary_key)
    }

    /// A field rendered as trimmed, non-empty text.
    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(value_text)
    }

    /// The first of `fields` that has a non-empty value.
    pub fn first_text(&self, fields: &[String]) -> Option<String> {
        fields.iter().find_map(|f| self.text(f))
    }

    /// The field bag plus `source` and `migrationStatus`, as rendered
    /// downstream. Existing fields of the same name are not overwritten.
    pub fn to_output_json(&self) -> Value {
        let mut out = self.fields.clone();
        out.entry("source")
            .or_insert_with(|| Value::String(self.source.as_str().to_string()));
        out.insert(
            "migrationStatus".to_string(),
            Value::String(self.migration_status.as_str().to_string()),
        );
        Value::Object(out)
    }
}

/// Render a scalar JSON value as trimmed text. Null, empty strings, arrays
/// and objects have no text form.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn status_only_moves_forward() {
        let mut status = MigrationStatus::NotChecked;
        assert!(status.advance(MigrationStatus::Partial));
        assert!(status.advance(MigrationStatus::Migrated));
        assert!(!status.advance(MigrationStatus::Partial));
        assert!(!status.advance(MigrationStatus::NotChecked));
        assert_eq!(status, MigrationStatus::Migrated);
    }

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_value(MigrationStatus::NotChecked).unwrap(),
            json!("not-checked")
        );
        assert_eq!(MigrationStatus::Migrated.to_string(), "migrated");
    }

    #[test]
    fn id_reads_numeric_and_string_keys() {
        let r = Record::new(Source::Legacy, "enquiries", "ID", row(json!({"ID": 123})));
        assert_eq!(r.id().as_deref(), Some("123"));

        let r = Record::new(Source::Current, "enquiries", "id", row(json!({"id": " 9 "})));
        assert_eq!(r.id().as_deref(), Some("9"));

        let r = Record::new(Source::Current, "enquiries", "id", row(json!({"id": null})));
        assert_eq!(r.id(), None);
    }

    #[test]
    fn first_text_skips_blank_fields() {
        let r = Record::new(
            Source::Legacy,
            "enquiries",
            "ID",
            row(json!({"ID": 1, "Email": "  ", "email": "a@x.com"})),
        );
        let fields = vec!["Email".to_string(), "email".to_string()];
        assert_eq!(r.first_text(&fields).as_deref(), Some("a@x.com"));
    }

    #[test]
    fn output_json_carries_status() {
        let mut r = Record::new(Source::Legacy, "enquiries", "ID", row(json!({"ID": 5})));
        r.migration_status.advance(MigrationStatus::Partial);
        let out = r.to_output_json();
        assert_eq!(out["ID"], json!(5));
        assert_eq!(out["source"], json!("legacy"));
        assert_eq!(out["migrationStatus"], json!("partial"));
    }
}
