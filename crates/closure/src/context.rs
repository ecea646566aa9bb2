//! The engine context: store handles plus expansion settings, built once
//! per process and passed to every resolution.

use std::sync::Arc;

use crossref_storage::{KeyKind, Source, StoreAdapter, StoreError};

use crate::config::ExpansionBudget;
use crate::error::ClosureError;
use crate::link::Link;

/// One store and the table its name searches run against.
#[derive(Clone)]
pub struct StoreHandle {
    pub adapter: Arc<dyn StoreAdapter>,
    /// Primary entity table for name searches. `None` disables name search
    /// in this store.
    pub primary_table: Option<String>,
}

impl StoreHandle {
    pub fn new(adapter: Arc<dyn StoreAdapter>) -> Self {
        StoreHandle {
            adapter,
            primary_table: None,
        }
    }

    pub fn with_primary_table(mut self, table: &str) -> Self {
        self.primary_table = Some(table.to_string());
        self
    }

    pub fn source(&self) -> Source {
        self.adapter.source()
    }
}

pub struct EngineContext {
    legacy: Option<StoreHandle>,
    current: Option<StoreHandle>,
    budget: ExpansionBudget,
    numeric_seed_kinds: Vec<KeyKind>,
    links: Vec<Link>,
}

impl EngineContext {
    pub fn new(budget: ExpansionBudget) -> Self {
        EngineContext {
            legacy: None,
            current: None,
            budget,
            numeric_seed_kinds: vec![KeyKind::ProspectId],
            links: Vec::new(),
        }
    }

    /// Register a store under the source its adapter reports.
    pub fn with_store(mut self, handle: StoreHandle) -> Self {
        match handle.source() {
            Source::Legacy => self.legacy = Some(handle),
            Source::Current => self.current = Some(handle),
        }
        self
    }

    pub fn with_numeric_seed_kinds(mut self, kinds: Vec<KeyKind>) -> Self {
        self.numeric_seed_kinds = kinds;
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }

    pub fn budget(&self) -> ExpansionBudget {
        self.budget
    }

    pub fn numeric_seed_kinds(&self) -> &[KeyKind] {
        &self.numeric_seed_kinds
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn store(&self, source: Source) -> Option<&StoreHandle> {
        match source {
            Source::Legacy => self.legacy.as_ref(),
            Source::Current => self.current.as_ref(),
        }
    }

    /// Both stores, legacy first. Missing either one is a configuration
    /// error, as is a link naming a table its store does not have.
    pub fn stores(&self) -> Result<[&StoreHandle; 2], ClosureError> {
        let legacy = self.require(Source::Legacy)?;
        let current = self.require(Source::Current)?;
        for link in &self.links {
            link.validate()?;
            let store = self.require(link.store)?;
            for table in [&link.lookup_table, &link.dependent_table] {
                if store.adapter.table(table).is_none() {
                    return Err(ClosureError::Configuration(format!(
                        "link {}: {} store has no table '{}'",
                        link, link.store, table
                    )));
                }
            }
        }
        Ok([legacy, current])
    }

    fn require(&self, source: Source) -> Result<&StoreHandle, ClosureError> {
        self.store(source).ok_or_else(|| {
            ClosureError::Configuration(
                StoreError::NotConfigured {
                    store: source.to_string(),
                }
                .to_string(),
            )
        })
    }
}
