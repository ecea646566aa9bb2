use crate::record::Source;

/// All errors that can be returned by a StoreAdapter implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store has no connection details. Fatal for the whole operation.
    #[error("store not configured: {store}")]
    NotConfigured { store: String },

    /// The store could not be loaded or connected to.
    #[error("could not load {store} store: {message}")]
    Load { store: String, message: String },

    /// The named table does not exist in this store.
    #[error("unknown table '{table}' in {store} store")]
    UnknownTable { store: Source, table: String },

    /// A single table query failed (bad column, driver error, etc.).
    #[error("query against '{table}' failed: {message}")]
    QueryFailed { table: String, message: String },

    /// A single table query exceeded its timeout.
    #[error("query against '{table}' timed out after {timeout_ms}ms")]
    Timeout { table: String, timeout_ms: u64 },
}

impl StoreError {
    /// Configuration and load failures abort an operation. Everything else is
    /// scoped to one table and can be recovered as a warning.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::NotConfigured { .. } | StoreError::Load { .. }
        )
    }
}
