//! In-memory store backend.
//!
//! Holds each table as a list of rows and evaluates predicates directly.
//! Tables can be built in code (`with_table`) or loaded from a JSON document:
//!
//! ```json
//! {
//!   "tables": {
//!     "enquiries": {
//!       "primary_key": "ID",
//!       "columns": { "ProspectId": "ID" },
//!       "name_columns": { "first": "First_Name", "last": "Last_Name" },
//!       "rows": [ { "ID": 500, "First_Name": "Jane", "Last_Name": "Smith" } ]
//!     }
//!   }
//! }
//! ```
//!
//! Column resolvers are introspected from the union of the rows' field
//! names; `columns` entries pin a kind to a column on top of that.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::StoreError;
use crate::key::KeyKind;
use crate::predicate::{Constraint, Predicate, Target};
use crate::record::{value_text, Row, Source};
use crate::resolver::{AliasCatalog, ColumnResolver};
use crate::traits::{NameColumns, QueryOutcome, StoreAdapter, TableSchema};

/// On-disk form of a whole store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreFile {
    pub tables: BTreeMap<String, TableFile>,
}

/// On-disk form of one table.
#[derive(Debug, Clone, Deserialize)]
pub struct TableFile {
    pub primary_key: String,
    /// Static kind → column pins, applied after introspection. Kinds are
    /// parsed leniently (`ProspectId`, `prospect_id`).
    #[serde(default)]
    pub columns: BTreeMap<String, String>,
    /// Kinds introspection must not assign in this table.
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub name_columns: Option<NameColumns>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

struct MemoryTable {
    schema: TableSchema,
    columns: BTreeSet<String>,
    rows: Vec<Row>,
}

/// A [`StoreAdapter`] over rows held in memory.
pub struct MemoryStore {
    source: Source,
    catalog: AliasCatalog,
    tables: BTreeMap<String, MemoryTable>,
}

impl MemoryStore {
    pub fn new(source: Source) -> Self {
        MemoryStore {
            source,
            catalog: AliasCatalog::default(),
            tables: BTreeMap::new(),
        }
    }

    /// Replace the alias catalog used to introspect tables added afterwards.
    pub fn with_catalog(mut self, catalog: AliasCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Add (or replace) a table, introspecting its column resolver.
    pub fn with_table(mut self, name: &str, primary_key: &str, rows: Vec<Row>) -> Self {
        let columns: BTreeSet<String> = rows.iter().flat_map(|r| r.keys().cloned()).collect();
        let names: Vec<&String> = columns.iter().collect();
        let resolver = ColumnResolver::introspect(&names, &self.catalog);
        self.tables.insert(
            name.to_string(),
            MemoryTable {
                schema: TableSchema {
                    name: name.to_string(),
                    primary_key: primary_key.to_string(),
                    resolver,
                    name_columns: None,
                },
                columns,
                rows,
            },
        );
        self
    }

    /// Pin `kind` to `column` in `table`. No-op for unknown tables.
    pub fn with_column(mut self, table: &str, kind: KeyKind, column: &str) -> Self {
        if let Some(t) = self.tables.get_mut(table) {
            t.schema.resolver = std::mem::take(&mut t.schema.resolver).with_column(kind, column);
        }
        self
    }

    /// Stop `table` resolving `kind`. No-op for unknown tables.
    pub fn without_kind(mut self, table: &str, kind: KeyKind) -> Self {
        if let Some(t) = self.tables.get_mut(table) {
            t.schema.resolver = std::mem::take(&mut t.schema.resolver).without(kind);
        }
        self
    }

    /// Enable name search on `table`. No-op for unknown tables.
    pub fn with_name_columns(mut self, table: &str, first: &str, last: &str) -> Self {
        if let Some(t) = self.tables.get_mut(table) {
            t.schema.name_columns = Some(NameColumns {
                first: first.to_string(),
                last: last.to_string(),
            });
        }
        self
    }

    /// Build a store from its JSON document form.
    pub fn from_json(source: Source, value: serde_json::Value) -> Result<Self, StoreError> {
        MemoryStore::new(source).load_json(value)
    }

    /// Read and parse a JSON store file.
    pub fn from_path(source: Source, path: &Path) -> Result<Self, StoreError> {
        MemoryStore::new(source).load_path(path)
    }

    /// Add the tables of a JSON store file, introspected with this store's
    /// catalog.
    pub fn load_path(self, path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::Load {
            store: self.source.to_string(),
            message: format!("could not read '{}': {}", path.display(), e),
        })?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| StoreError::Load {
                store: self.source.to_string(),
                message: format!("could not parse '{}': {}", path.display(), e),
            })?;
        self.load_json(value)
    }

    /// Add the tables of a JSON store document.
    pub fn load_json(self, value: serde_json::Value) -> Result<Self, StoreError> {
        let file: StoreFile = serde_json::from_value(value).map_err(|e| StoreError::Load {
            store: self.source.to_string(),
            message: e.to_string(),
        })?;
        self.load_file(file)
    }

    fn load_file(self, file: StoreFile) -> Result<Self, StoreError> {
        let source = self.source;
        let bad_kind = |table: &str, e: crate::key::KeyParseError| StoreError::Load {
            store: source.to_string(),
            message: format!("table '{}': {}", table, e),
        };

        let mut store = self;
        for (name, table) in file.tables {
            store = store.with_table(&name, &table.primary_key, table.rows);
            for kind in &table.ignore {
                let kind: KeyKind = kind.parse().map_err(|e| bad_kind(&name, e))?;
                store = store.without_kind(&name, kind);
            }
            for (kind, column) in &table.columns {
                let kind: KeyKind = kind.parse().map_err(|e| bad_kind(&name, e))?;
                store = store.with_column(&name, kind, column);
            }
            if let Some(names) = &table.name_columns {
                store = store.with_name_columns(&name, &names.first, &names.last);
            }
        }
        Ok(store)
    }

    /// All rows of a table, in insertion order.
    pub fn rows(&self, table: &str) -> Option<&[Row]> {
        self.tables.get(table).map(|t| t.rows.as_slice())
    }

    fn unknown_table(&self, table: &str) -> StoreError {
        StoreError::UnknownTable {
            store: self.source,
            table: table.to_string(),
        }
    }
}

/// A constraint bound to the physical column it reads.
struct BoundConstraint<'a> {
    column: &'a str,
    kind: Option<KeyKind>,
    constraint: &'a Constraint,
}

impl BoundConstraint<'_> {
    fn matches(&self, row: &Row) -> bool {
        let Some(raw) = row.get(self.column) else {
            return false;
        };
        match self.kind {
            Some(kind) => kind
                .normalize(raw)
                .is_some_and(|v| self.constraint.values.contains(&v)),
            None => self.constraint.values.iter().any(|v| v.matches_raw(raw)),
        }
    }
}

fn name_matches(row: &Row, names: &NameColumns, tokens: &[String]) -> bool {
    let first = row.get(&names.first).and_then(value_text).unwrap_or_default();
    let last = row.get(&names.last).and_then(value_text).unwrap_or_default();
    let full = format!("{} {}", first, last).to_lowercase();
    !tokens.is_empty() && tokens.iter().all(|t| full.contains(t.as_str()))
}

#[async_trait]
impl StoreAdapter for MemoryStore {
    fn source(&self) -> Source {
        self.source
    }

    fn tables(&self) -> Vec<TableSchema> {
        self.tables.values().map(|t| t.schema.clone()).collect()
    }

    async fn query(
        &self,
        table: &str,
        predicate: &Predicate,
    ) -> Result<QueryOutcome, StoreError> {
        let t = self
            .tables
            .get(table)
            .ok_or_else(|| self.unknown_table(table))?;

        match predicate {
            Predicate::AllOf(constraints) => {
                let mut bound = Vec::with_capacity(constraints.len());
                for c in constraints {
                    let (column, kind) = match &c.target {
                        Target::Kind(kind) => match t.schema.resolver.resolve(*kind) {
                            Some(column) => (column, Some(*kind)),
                            None => {
                                return Ok(QueryOutcome::NotApplicable {
                                    detail: format!("{} has no {} column", table, kind),
                                })
                            }
                        },
                        Target::Column(column) if t.columns.contains(column) => {
                            (column.as_str(), None)
                        }
                        Target::Column(column) => {
                            return Ok(QueryOutcome::NotApplicable {
                                detail: format!("{} has no column '{}'", table, column),
                            })
                        }
                    };
                    bound.push(BoundConstraint {
                        column,
                        kind,
                        constraint: c,
                    });
                }
                let rows = t
                    .rows
                    .iter()
                    .filter(|row| bound.iter().all(|b| b.matches(row)))
                    .cloned()
                    .collect();
                Ok(QueryOutcome::Rows(rows))
            }
            Predicate::NameMatch { tokens } => match &t.schema.name_columns {
                Some(names) => Ok(QueryOutcome::Rows(
                    t.rows
                        .iter()
                        .filter(|row| name_matches(row, names, tokens))
                        .cloned()
                        .collect(),
                )),
                None => Ok(QueryOutcome::NotApplicable {
                    detail: format!("{} does not support name search", table),
                }),
            },
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyValue;
    use serde_json::json;

    fn rows(value: serde_json::Value) -> Vec<Row> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect()
    }

    fn legacy() -> MemoryStore {
        MemoryStore::new(Source::Legacy)
            .with_table(
                "enquiries",
                "ID",
                rows(json!([
                    {"ID": 500, "Email": "Jane@Example.com", "First_Name": "Jane", "Last_Name": "Smith"},
                    {"ID": 501, "Email": "bob@example.com", "First_Name": "Bob", "Last_Name": "Jones"}
                ])),
            )
            .with_column("enquiries", KeyKind::ProspectId, "ID")
            .with_name_columns("enquiries", "First_Name", "Last_Name")
    }

    #[tokio::test]
    async fn kind_query_uses_resolved_column() {
        let store = legacy();
        let outcome = store
            .query(
                "enquiries",
                &Predicate::kind_in(KeyKind::ProspectId, vec![KeyValue::Int(500)]),
            )
            .await
            .unwrap();
        let found = outcome.into_rows();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["ID"], json!(500));
    }

    #[tokio::test]
    async fn kind_query_normalizes_row_values() {
        let store = legacy();
        let found = store
            .query(
                "enquiries",
                &Predicate::kind_in(
                    KeyKind::Email,
                    vec![KeyValue::Text("jane@example.com".to_string())],
                ),
            )
            .await
            .unwrap()
            .into_rows();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn missing_kind_is_not_applicable() {
        let store = legacy();
        let outcome = store
            .query(
                "enquiries",
                &Predicate::kind_in(KeyKind::DealId, vec![KeyValue::Int(1)]),
            )
            .await
            .unwrap();
        assert!(matches!(outcome, QueryOutcome::NotApplicable { .. }));
    }

    #[tokio::test]
    async fn unknown_table_is_an_error() {
        let store = legacy();
        let result = store
            .query("matters", &Predicate::name("jane"))
            .await;
        assert_eq!(
            result,
            Err(StoreError::UnknownTable {
                store: Source::Legacy,
                table: "matters".to_string()
            })
        );
    }

    #[tokio::test]
    async fn raw_column_query_matches_loosely() {
        let store = legacy();
        let found = store
            .query(
                "enquiries",
                &Predicate::column_in("ID", vec![KeyValue::Text("501".to_string())]),
            )
            .await
            .unwrap()
            .into_rows();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["First_Name"], json!("Bob"));
    }

    #[tokio::test]
    async fn name_search_requires_every_token() {
        let store = legacy();
        let found = store
            .query("enquiries", &Predicate::name("jane smith"))
            .await
            .unwrap()
            .into_rows();
        assert_eq!(found.len(), 1);

        let found = store
            .query("enquiries", &Predicate::name("jane jones"))
            .await
            .unwrap()
            .into_rows();
        assert!(found.is_empty());
    }

    #[test]
    fn from_json_applies_pins_and_ignores() {
        let store = MemoryStore::from_json(
            Source::Current,
            json!({
                "tables": {
                    "Deals": {
                        "primary_key": "DealId",
                        "columns": {"DealId": "DealId"},
                        "ignore": ["Passcode"],
                        "rows": [{"DealId": 9001, "ProspectId": 500, "Passcode": 12}]
                    }
                }
            }),
        )
        .unwrap();
        let schema = store.table("Deals").unwrap();
        assert_eq!(schema.primary_key, "DealId");
        assert_eq!(schema.resolver.resolve(KeyKind::ProspectId), Some("ProspectId"));
        assert_eq!(schema.resolver.resolve(KeyKind::Passcode), None);
        assert_eq!(store.rows("Deals").map(<[Row]>::len), Some(1));
    }

    #[test]
    fn custom_catalog_applies_to_loaded_tables() {
        let mut catalog = AliasCatalog::default();
        catalog.extend(KeyKind::ProspectId, &["Lead_Ref"]);
        let document = json!({
            "tables": {
                "leads": {"primary_key": "Lead_Ref", "rows": [{"Lead_Ref": 42}]}
            }
        });

        let plain = MemoryStore::from_json(Source::Legacy, document.clone()).unwrap();
        assert_eq!(plain.table("leads").unwrap().resolver.resolve(KeyKind::ProspectId), None);

        let store = MemoryStore::new(Source::Legacy)
            .with_catalog(catalog)
            .load_json(document)
            .unwrap();
        assert_eq!(
            store.table("leads").unwrap().resolver.resolve(KeyKind::ProspectId),
            Some("Lead_Ref")
        );
    }

    #[test]
    fn from_json_rejects_unknown_kinds() {
        let result = MemoryStore::from_json(
            Source::Legacy,
            json!({"tables": {"t": {"primary_key": "id", "columns": {"Colour": "c"}}}}),
        );
        assert!(matches!(result, Err(StoreError::Load { .. })));
    }

    #[test]
    fn from_json_reports_bad_documents() {
        let err = MemoryStore::from_json(Source::Legacy, json!({"tables": 3}))
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }
}
