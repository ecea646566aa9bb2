//! Store adapter interface for crossref.
//!
//! Everything the reconciliation and closure engines need from a backing
//! store lives here: the [`StoreAdapter`] trait, the [`Record`] and [`Key`]
//! types that flow between stores, per-table [`ColumnResolver`]s, and the
//! [`MemoryStore`] backend used by the CLI and tests.

pub mod conformance;
mod error;
mod key;
mod memory;
mod predicate;
mod record;
mod resolver;
mod traits;

pub use error::StoreError;
pub use key::{Key, KeyKind, KeyParseError, KeyValue};
pub use memory::{MemoryStore, StoreFile, TableFile};
pub use predicate::{Constraint, Predicate, Target};
pub use record::{value_text, MigrationStatus, Record, Row, Source};
pub use resolver::{normalize_column, AliasCatalog, ColumnResolver};
pub use traits::{NameColumns, QueryOutcome, StoreAdapter, TableSchema};
