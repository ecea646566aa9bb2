//! The `crossref.toml` configuration file.
//!
//! # Example
//!
//! ```toml
//! [expansion]
//! max_passes = 8
//! query_timeout_ms = 5000
//!
//! [reconcile.current]
//! legacy_ref = ["acid"]
//!
//! [stores.legacy]
//! path = "legacy.json"
//! primary_table = "enquiries"
//! first_name_column = "First_Name"
//! last_name_column = "Last_Name"
//!
//! [stores.legacy.columns.enquiries]
//! ProspectId = "ID"
//!
//! [stores.legacy.aliases]
//! ProspectId = ["Lead_Ref"]
//!
//! [stores.current]
//! path = "current.json"
//!
//! [[links]]
//! store = "current"
//! lookup_table = "Instructions"
//! from_kind = "InstructionRef"
//! intermediate_column = "InternalId"
//! dependent_table = "IdVerifications"
//! dependent_column = "InstructionInternalId"
//! ```
//!
//! Every section is optional. Store paths are relative to the file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crossref_closure::{EngineContext, ExpansionConfig, Link, StoreHandle};
use crossref_reconcile::ReconcileConfig;
use crossref_storage::{AliasCatalog, KeyKind, MemoryStore, Source};

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrossrefConfig {
    pub expansion: ExpansionConfig,
    pub reconcile: ReconcileConfig,
    pub stores: StoresConfig,
    pub links: Vec<Link>,
}

/// `[stores]`: one section per store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoresConfig {
    pub legacy: Option<StoreConfig>,
    pub current: Option<StoreConfig>,
}

/// `[stores.<source>]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// JSON store file.
    pub path: PathBuf,
    /// Table that name seeds are searched in.
    #[serde(default = "default_primary_table")]
    pub primary_table: String,
    pub first_name_column: Option<String>,
    pub last_name_column: Option<String>,
    /// Static kind → column pins, per table.
    #[serde(default)]
    pub columns: BTreeMap<String, BTreeMap<String, String>>,
    /// Extra column names per kind, tried after the built-in aliases when
    /// introspecting every table of the store.
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
}

fn default_primary_table() -> String {
    "enquiries".to_string()
}

// ── Functions ─────────────────────────────────────────────────────────────────

/// Read and parse a config file. Relative store paths are resolved against
/// the file's directory.
pub fn read_config(path: &Path) -> Result<CrossrefConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    let mut config: CrossrefConfig = toml::from_str(&content)
        .map_err(|e| format!("could not parse '{}': {}", path.display(), e))?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    for store in [&mut config.stores.legacy, &mut config.stores.current]
        .into_iter()
        .flatten()
    {
        if store.path.is_relative() {
            store.path = base.join(&store.path);
        }
    }
    Ok(config)
}

impl StoreConfig {
    /// Load the store file and apply the configured overrides.
    pub fn load(&self, source: Source) -> Result<MemoryStore, String> {
        let mut store = MemoryStore::new(source)
            .with_catalog(self.catalog(source)?)
            .load_path(&self.path)
            .map_err(|e| e.to_string())?;

        for (table, pins) in &self.columns {
            if store.rows(table).is_none() {
                return Err(format!(
                    "stores.{}.columns: no table '{}' in '{}'",
                    source,
                    table,
                    self.path.display()
                ));
            }
            for (kind, column) in pins {
                let kind: KeyKind = kind
                    .parse()
                    .map_err(|e| format!("stores.{}.columns.{}: {}", source, table, e))?;
                store = store.with_column(table, kind, column);
            }
        }

        match (&self.first_name_column, &self.last_name_column) {
            (Some(first), Some(last)) => {
                store = store.with_name_columns(&self.primary_table, first, last);
            }
            (None, None) => {}
            _ => {
                return Err(format!(
                    "stores.{}: first_name_column and last_name_column must be set together",
                    source
                ))
            }
        }
        Ok(store)
    }
}

impl StoreConfig {
    /// The built-in alias catalog extended with `aliases`.
    fn catalog(&self, source: Source) -> Result<AliasCatalog, String> {
        let mut catalog = AliasCatalog::default();
        for (kind, names) in &self.aliases {
            let kind: KeyKind = kind
                .parse()
                .map_err(|e| format!("stores.{}.aliases: {}", source, e))?;
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            catalog.extend(kind, &names);
        }
        Ok(catalog)
    }
}

impl CrossrefConfig {
    /// Build the engine context, loading both stores. A missing store
    /// section is a configuration error.
    pub fn engine_context(&self) -> Result<EngineContext, String> {
        let budget = self.expansion.budget().map_err(|e| e.to_string())?;
        let kinds = self.expansion.numeric_kinds().map_err(|e| e.to_string())?;
        let mut ctx = EngineContext::new(budget).with_numeric_seed_kinds(kinds);

        for (source, section) in [
            (Source::Legacy, &self.stores.legacy),
            (Source::Current, &self.stores.current),
        ] {
            let section = section.as_ref().ok_or_else(|| {
                format!(
                    "configuration error: no [stores.{}] section with a store path",
                    source
                )
            })?;
            let store = section.load(source)?;
            ctx = ctx.with_store(
                StoreHandle::new(Arc::new(store)).with_primary_table(&section.primary_table),
            );
        }

        for link in &self.links {
            ctx = ctx.with_link(link.clone());
        }
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossref_storage::StoreAdapter;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: CrossrefConfig = toml::from_str("").unwrap();
        assert_eq!(config.expansion, ExpansionConfig::default());
        assert_eq!(config.reconcile, ReconcileConfig::default());
        assert!(config.stores.legacy.is_none());
        assert!(config.links.is_empty());
    }

    #[test]
    fn full_file_parses() {
        let config: CrossrefConfig = toml::from_str(
            r#"
[expansion]
max_passes = 4
numeric_seed_kinds = ["ProspectId", "DealId"]

[reconcile.legacy]
timestamp = ["Touchpoint_Date"]

[stores.legacy]
path = "legacy.json"
first_name_column = "First_Name"
last_name_column = "Last_Name"

[stores.legacy.columns.enquiries]
ProspectId = "ID"

[stores.current]
path = "/data/current.json"
primary_table = "Enquiries"

[[links]]
store = "current"
lookup_table = "Instructions"
from_kind = "InstructionRef"
intermediate_column = "InternalId"
dependent_table = "IdVerifications"
dependent_column = "InstructionInternalId"
"#,
        )
        .unwrap();

        assert_eq!(config.expansion.max_passes, 4);
        assert_eq!(config.reconcile.legacy.timestamp, vec!["Touchpoint_Date"]);
        let legacy = config.stores.legacy.unwrap();
        assert_eq!(legacy.primary_table, "enquiries");
        assert_eq!(legacy.columns["enquiries"]["ProspectId"], "ID");
        assert_eq!(
            config.stores.current.unwrap().primary_table,
            "Enquiries"
        );
        assert_eq!(config.links.len(), 1);
        assert_eq!(config.links[0].from_kind, KeyKind::InstructionRef);
    }

    #[test]
    fn unknown_section_is_rejected() {
        assert!(toml::from_str::<CrossrefConfig>("[storez]\n").is_err());
    }

    #[test]
    fn store_aliases_extend_introspection() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("legacy.json"),
            r#"{"tables": {"leads": {"primary_key": "Lead_Ref", "rows": [{"Lead_Ref": 42}]}}}"#,
        )
        .unwrap();
        let path = dir.path().join("crossref.toml");
        std::fs::write(
            &path,
            "[stores.legacy]\npath = \"legacy.json\"\n\n[stores.legacy.aliases]\nprospect_id = [\"Lead_Ref\"]\n",
        )
        .unwrap();

        let config = read_config(&path).unwrap();
        let store = config.stores.legacy.unwrap().load(Source::Legacy).unwrap();
        let schema = store.table("leads").unwrap();
        assert_eq!(schema.resolver.resolve(KeyKind::ProspectId), Some("Lead_Ref"));
    }

    #[test]
    fn unknown_alias_kind_is_rejected() {
        let config: CrossrefConfig = toml::from_str(
            "[stores.legacy]\npath = \"legacy.json\"\n\n[stores.legacy.aliases]\nColour = [\"c\"]\n",
        )
        .unwrap();
        let err = config.stores.legacy.unwrap().load(Source::Legacy).err().unwrap();
        assert!(err.contains("stores.legacy.aliases"), "{err}");
    }

    #[test]
    fn missing_store_section_is_reported() {
        let err = CrossrefConfig::default().engine_context().err().unwrap();
        assert!(err.contains("[stores.legacy]"), "{err}");
    }
}
