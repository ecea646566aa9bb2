use crossref_storage::StoreError;

/// Failures that abort a closure resolution.
///
/// Anything scoped to a single table query is reported as a
/// [`ClosureWarning`](crate::ClosureWarning) instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClosureError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("seed is empty")]
    EmptySeed,
    #[error("invalid seed '{seed}': {reason}")]
    InvalidSeed { seed: String, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}
