use std::path::Path;
use std::process;

use crossref_reconcile::ReconcileConfig;
use crossref_storage::Row;

use crate::{print_json, report_error, OutputFormat};

pub(crate) fn cmd_reconcile(
    legacy_path: &Path,
    current_path: &Path,
    config_path: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let config = match config_path {
        Some(path) => match crate::config::read_config(path) {
            Ok(c) => c.reconcile,
            Err(msg) => {
                report_error(&msg, output, quiet);
                process::exit(1);
            }
        },
        None => ReconcileConfig::default(),
    };

    let legacy = read_rows_or_exit(legacy_path, output, quiet);
    let current = read_rows_or_exit(current_path, output, quiet);

    match crossref_reconcile::reconcile(legacy, current, &config) {
        Ok(outcome) => match output {
            OutputFormat::Text => println!("{}", outcome.to_text()),
            OutputFormat::Json => print_json(&outcome.to_json()),
        },
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn read_rows_or_exit(path: &Path, output: OutputFormat, quiet: bool) -> Vec<Row> {
    match read_rows(path) {
        Ok(rows) => rows,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// A JSON array of objects.
fn read_rows(path: &Path) -> Result<Vec<Row>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading '{}': {}", path.display(), e))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("error parsing JSON in '{}': {}", path.display(), e))?;
    let items = value
        .as_array()
        .ok_or_else(|| format!("'{}': expected a JSON array of rows", path.display()))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_object()
                .cloned()
                .ok_or_else(|| format!("'{}': row {} is not an object", path.display(), i))
        })
        .collect()
}
