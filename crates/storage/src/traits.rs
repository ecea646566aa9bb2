use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::predicate::Predicate;
use crate::record::{Row, Source};
use crate::resolver::ColumnResolver;

/// Columns holding a person's first and last name, for name searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameColumns {
    pub first: String,
    pub last: String,
}

/// What a store knows about one of its tables.
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: String,
    pub primary_key: String,
    pub resolver: ColumnResolver,
    /// Present only on tables that support name search.
    pub name_columns: Option<NameColumns>,
}

/// Result of a single table query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The predicate applied; zero or more rows matched.
    Rows(Vec<Row>),
    /// The table has no column for something the predicate asked about.
    /// Not an error: the caller simply skips this table.
    NotApplicable { detail: String },
}

impl QueryOutcome {
    /// Rows, or an empty list when the query did not apply.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryOutcome::Rows(rows) => rows,
            QueryOutcome::NotApplicable { .. } => Vec::new(),
        }
    }
}

/// The storage interface consumed by the reconciliation and closure engines.
///
/// An adapter fronts exactly one store (legacy or current). It resolves the
/// key kinds in a [`Predicate`] to its own column names per table and
/// reports [`QueryOutcome::NotApplicable`] rather than an error when a table
/// has no such column.
///
/// ## Errors
///
/// `StoreError::UnknownTable`, `QueryFailed` and `Timeout` are scoped to the
/// one query and are recovered by callers. `NotConfigured` and `Load` are
/// fatal.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` so that queries within
/// one expansion pass can be spawned onto separate tasks.
#[async_trait]
pub trait StoreAdapter: Send + Sync + 'static {
    /// Which store this adapter fronts.
    fn source(&self) -> Source;

    /// Schemas of every table the adapter can query, in a stable order.
    fn tables(&self) -> Vec<TableSchema>;

    /// Rows of `table` matching `predicate`.
    async fn query(
        &self,
        table: &str,
        predicate: &Predicate,
    ) -> Result<QueryOutcome, StoreError>;

    /// Schema of one table, by name.
    fn table(&self, name: &str) -> Option<TableSchema> {
        self.tables().into_iter().find(|t| t.name == name)
    }
}
