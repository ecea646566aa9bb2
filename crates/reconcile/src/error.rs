/// Errors that abort a reconciliation run.
///
/// Per-record problems (an unparsable timestamp, a missing id) are never
/// errors: the record is left out of the one step it breaks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// A field list in the configuration has no candidate names.
    #[error("{side} field list '{field}' is empty")]
    EmptyFieldList { side: String, field: String },
}
