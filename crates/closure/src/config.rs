//! Expansion settings.
//!
//! ```toml
//! [expansion]
//! max_passes = 8
//! deadline_ms = 30000
//! query_timeout_ms = 5000
//! numeric_seed_kinds = ["ProspectId"]
//! ```

use serde::Deserialize;
use std::time::Duration;

use crossref_storage::KeyKind;

use crate::error::ClosureError;

/// Hard bounds on one expansion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionBudget {
    pub max_passes: usize,
    pub deadline: Duration,
    pub query_timeout: Duration,
}

impl Default for ExpansionBudget {
    fn default() -> Self {
        ExpansionBudget {
            max_passes: 8,
            deadline: Duration::from_millis(30_000),
            query_timeout: Duration::from_millis(5_000),
        }
    }
}

/// The `[expansion]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpansionConfig {
    pub max_passes: usize,
    pub deadline_ms: u64,
    pub query_timeout_ms: u64,
    /// Kinds a purely numeric seed is tried as. Parsed leniently.
    pub numeric_seed_kinds: Vec<String>,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        let budget = ExpansionBudget::default();
        ExpansionConfig {
            max_passes: budget.max_passes,
            deadline_ms: budget.deadline.as_millis() as u64,
            query_timeout_ms: budget.query_timeout.as_millis() as u64,
            numeric_seed_kinds: vec![KeyKind::ProspectId.to_string()],
        }
    }
}

impl ExpansionConfig {
    pub fn budget(&self) -> Result<ExpansionBudget, ClosureError> {
        if self.max_passes == 0 {
            return Err(ClosureError::Configuration(
                "expansion.max_passes must be at least 1".to_string(),
            ));
        }
        if self.query_timeout_ms == 0 {
            return Err(ClosureError::Configuration(
                "expansion.query_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(ExpansionBudget {
            max_passes: self.max_passes,
            deadline: Duration::from_millis(self.deadline_ms),
            query_timeout: Duration::from_millis(self.query_timeout_ms),
        })
    }

    pub fn numeric_kinds(&self) -> Result<Vec<KeyKind>, ClosureError> {
        let kinds = self
            .numeric_seed_kinds
            .iter()
            .map(|name| {
                let kind: KeyKind = name
                    .parse()
                    .map_err(|e| ClosureError::Configuration(format!("numeric_seed_kinds: {}", e)))?;
                if kind.is_numeric() {
                    Ok(kind)
                } else {
                    Err(ClosureError::Configuration(format!(
                        "numeric_seed_kinds: {} is not a numeric kind",
                        kind
                    )))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        if kinds.is_empty() {
            return Err(ClosureError::Configuration(
                "numeric_seed_kinds must name at least one kind".to_string(),
            ));
        }
        Ok(kinds)
    }
}
