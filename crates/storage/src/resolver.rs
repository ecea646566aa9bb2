//! Per-table mapping from logical key kinds to physical column names.
//!
//! Both stores have drifted over the years: the same identifier is called
//! `ProspectId` in one table, `prospect_id` in another and `acid` in a third.
//! A [`ColumnResolver`] is built once per table, either by introspecting the
//! table's column names against an [`AliasCatalog`] or from static
//! configuration, and every query goes through it.

use std::collections::BTreeMap;

use crate::key::KeyKind;

/// Normalize a column name for alias comparison: lower-case, with
/// underscores, hyphens and spaces removed.
pub fn normalize_column(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Historical column names for each key kind, in priority order.
#[derive(Debug, Clone)]
pub struct AliasCatalog {
    aliases: BTreeMap<KeyKind, Vec<String>>,
}

impl Default for AliasCatalog {
    fn default() -> Self {
        let mut catalog = AliasCatalog::empty();
        catalog.extend(KeyKind::InstructionRef, &["InstructionRef", "Instruction_Ref"]);
        catalog.extend(
            KeyKind::ProspectId,
            &["ProspectId", "Prospect_ID", "acid", "EnquiryId", "Enquiry_ID"],
        );
        catalog.extend(KeyKind::Passcode, &["Passcode", "Pass_Code"]);
        catalog.extend(
            KeyKind::Email,
            &[
                "Email",
                "Email_Address",
                "ClientEmail",
                "Client_Email",
                "LeadClientEmail",
            ],
        );
        catalog.extend(KeyKind::DealId, &["DealId", "Deal_ID"]);
        catalog.extend(KeyKind::MatterId, &["MatterId", "Matter_ID", "MatterUniqueId"]);
        catalog.extend(KeyKind::ClientId, &["ClientId", "Client_ID"]);
        catalog
    }
}

impl AliasCatalog {
    pub fn empty() -> Self {
        AliasCatalog {
            aliases: BTreeMap::new(),
        }
    }

    /// Append aliases for a kind. Earlier aliases win during introspection.
    pub fn extend(&mut self, kind: KeyKind, names: &[&str]) {
        let entry = self.aliases.entry(kind).or_default();
        for name in names {
            let normalized = normalize_column(name);
            if !entry.contains(&normalized) {
                entry.push(normalized);
            }
        }
    }

    /// Normalized aliases for a kind, in priority order.
    pub fn aliases(&self, kind: KeyKind) -> &[String] {
        self.aliases.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Maps key kinds to the actual column names of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnResolver {
    columns: BTreeMap<KeyKind, String>,
}

impl ColumnResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a resolver by matching a table's column names against the
    /// catalog. For each kind, the first alias (in catalog order) that names
    /// one of the columns wins. A column is claimed by at most one kind.
    pub fn introspect<S: AsRef<str>>(columns: &[S], catalog: &AliasCatalog) -> Self {
        let by_normalized: BTreeMap<String, &str> = columns
            .iter()
            .map(|c| (normalize_column(c.as_ref()), c.as_ref()))
            .collect();

        let mut resolver = ColumnResolver::new();
        for kind in KeyKind::ALL {
            let found = catalog
                .aliases(kind)
                .iter()
                .filter_map(|alias| by_normalized.get(alias))
                .find(|column| resolver.kind_of(column).is_none());
            if let Some(column) = found {
                resolver.columns.insert(kind, column.to_string());
            }
        }
        resolver
    }

    /// Pin a kind to a column, replacing whatever introspection found and
    /// releasing the column from any other kind.
    pub fn with_column(mut self, kind: KeyKind, column: &str) -> Self {
        self.columns.retain(|_, c| c != column);
        self.columns.insert(kind, column.to_string());
        self
    }

    /// Drop a kind, e.g. when introspection picked up a column that means
    /// something else in this table.
    pub fn without(mut self, kind: KeyKind) -> Self {
        self.columns.remove(&kind);
        self
    }

    /// The column holding `kind` in this table, if any.
    pub fn resolve(&self, kind: KeyKind) -> Option<&str> {
        self.columns.get(&kind).map(String::as_str)
    }

    /// The kind a column carries, if it carries one.
    pub fn kind_of(&self, column: &str) -> Option<KeyKind> {
        self.columns
            .iter()
            .find(|(_, c)| c.as_str() == column)
            .map(|(k, _)| *k)
    }

    /// All `(kind, column)` pairs, ordered by kind.
    pub fn entries(&self) -> impl Iterator<Item = (KeyKind, &str)> {
        self.columns.iter().map(|(k, c)| (*k, c.as_str()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = KeyKind> + '_ {
        self.columns.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
