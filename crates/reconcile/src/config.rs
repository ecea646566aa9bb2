//! Field names used to read legacy and current records.
//!
//! Every entry is a list of candidate field names, tried in order; the first
//! one with a non-empty value wins. The defaults match the two enquiry
//! schemas as they exist today and can be overridden per side:
//!
//! ```toml
//! [reconcile.legacy]
//! timestamp = ["Touchpoint_Date", "Date_Created"]
//!
//! [reconcile.current]
//! legacy_ref = ["acid"]
//! ```

use serde::Deserialize;

use crate::error::ReconcileError;

/// Candidate field names for one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    /// Table name stamped on records built from raw rows.
    pub table: String,
    pub id: Vec<String>,
    /// Field holding the legacy id a record migrated from. Only meaningful
    /// on the current side.
    pub legacy_ref: Vec<String>,
    pub email: Vec<String>,
    pub phone: Vec<String>,
    pub timestamp: Vec<String>,
    pub first_name: Vec<String>,
    pub last_name: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl FieldMap {
    pub fn legacy() -> Self {
        FieldMap {
            table: "enquiries".to_string(),
            id: names(&["ID", "id"]),
            legacy_ref: Vec::new(),
            email: names(&["Email", "email"]),
            phone: names(&["Phone_Number", "phone"]),
            timestamp: names(&["Touchpoint_Date", "Date_Created", "datetime"]),
            first_name: names(&["First_Name", "first"]),
            last_name: names(&["Last_Name", "last"]),
        }
    }

    pub fn current() -> Self {
        FieldMap {
            table: "enquiries".to_string(),
            id: names(&["id", "ID"]),
            legacy_ref: names(&["acid"]),
            email: names(&["email", "Email"]),
            phone: names(&["phone", "Phone_Number"]),
            timestamp: names(&["datetime", "date_created", "Date_Created"]),
            first_name: names(&["first", "First_Name"]),
            last_name: names(&["last", "Last_Name"]),
        }
    }

    fn validate(&self, side: &str) -> Result<(), ReconcileError> {
        let required = [
            ("id", &self.id),
            ("email", &self.email),
            ("phone", &self.phone),
            ("timestamp", &self.timestamp),
        ];
        for (field, list) in required {
            if list.is_empty() {
                return Err(ReconcileError::EmptyFieldList {
                    side: side.to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A partial [`FieldMap`] as written in configuration. Absent entries keep
/// the side's default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldOverrides {
    pub table: Option<String>,
    pub id: Option<Vec<String>>,
    pub legacy_ref: Option<Vec<String>>,
    pub email: Option<Vec<String>>,
    pub phone: Option<Vec<String>>,
    pub timestamp: Option<Vec<String>>,
    pub first_name: Option<Vec<String>>,
    pub last_name: Option<Vec<String>>,
}

impl FieldMap {
    pub fn apply(mut self, o: FieldOverrides) -> Self {
        if let Some(table) = o.table {
            self.table = table;
        }
        let lists = [
            (&mut self.id, o.id),
            (&mut self.legacy_ref, o.legacy_ref),
            (&mut self.email, o.email),
            (&mut self.phone, o.phone),
            (&mut self.timestamp, o.timestamp),
            (&mut self.first_name, o.first_name),
            (&mut self.last_name, o.last_name),
        ];
        for (slot, value) in lists {
            if let Some(value) = value {
                *slot = value;
            }
        }
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawReconcileConfig {
    legacy: FieldOverrides,
    current: FieldOverrides,
}

impl From<RawReconcileConfig> for ReconcileConfig {
    fn from(raw: RawReconcileConfig) -> Self {
        ReconcileConfig {
            legacy: FieldMap::legacy().apply(raw.legacy),
            current: FieldMap::current().apply(raw.current),
        }
    }
}

/// Field maps for both sides.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawReconcileConfig")]
pub struct ReconcileConfig {
    pub legacy: FieldMap,
    pub current: FieldMap,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        ReconcileConfig {
            legacy: FieldMap::legacy(),
            current: FieldMap::current(),
        }
    }
}

impl ReconcileConfig {
    pub fn validate(&self) -> Result<(), ReconcileError> {
        self.legacy.validate("legacy")?;
        self.current.validate("current")
    }
}
