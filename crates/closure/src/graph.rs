//! Which key kinds feed which searches.
//!
//! Nodes are key kinds. Every table contributes edges from each kind it can
//! be searched by to each kind it can produce. A kind harvested from a row
//! is only worth searching if some *other* table is searchable by it;
//! otherwise the search would just return the row it came from.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crossref_storage::{KeyKind, Source, TableSchema};

/// A table qualified by its store, displayed as `legacy.enquiries`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableRef {
    pub source: Source,
    pub table: String,
}

impl TableRef {
    pub fn new(source: Source, table: &str) -> Self {
        TableRef {
            source,
            table: table.to_string(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source, self.table)
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeyGraph {
    searchable: BTreeMap<KeyKind, BTreeSet<TableRef>>,
    produces: BTreeMap<TableRef, BTreeSet<KeyKind>>,
}

impl KeyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, source: Source, schema: &TableSchema) {
        let table = TableRef::new(source, &schema.name);
        let kinds: BTreeSet<KeyKind> = schema.resolver.kinds().collect();
        for kind in &kinds {
            self.searchable
                .entry(*kind)
                .or_default()
                .insert(table.clone());
        }
        self.produces.insert(table, kinds);
    }

    /// Tables a kind can be searched in.
    pub fn tables_for(&self, kind: KeyKind) -> impl Iterator<Item = &TableRef> {
        self.searchable.get(&kind).into_iter().flatten()
    }

    /// Whether a `kind` value harvested from `producer` should become a
    /// search key.
    pub fn is_live(&self, kind: KeyKind, producer: &TableRef) -> bool {
        self.tables_for(kind).any(|t| t != producer)
    }

    /// Kinds reachable in one hop from `kind`: everything produced by the
    /// tables `kind` searches, that is itself live from that table.
    pub fn feeds(&self, kind: KeyKind) -> BTreeSet<KeyKind> {
        let mut out = BTreeSet::new();
        for table in self.tables_for(kind) {
            for produced in self.produces.get(table).into_iter().flatten() {
                if *produced != kind && self.is_live(*produced, table) {
                    out.insert(*produced);
                }
            }
        }
        out
    }
}
