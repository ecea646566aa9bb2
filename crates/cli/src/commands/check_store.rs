use std::path::Path;
use std::process;

use crossref_storage::conformance::{run_conformance_suite, Probe};
use crossref_storage::{KeyKind, MemoryStore, Source};
use serde_json::json;

use crate::{print_json, report_error, runtime, OutputFormat};

pub(crate) fn cmd_check_store(
    store_path: &Path,
    source: Source,
    table: &str,
    kind: KeyKind,
    value: &str,
    output: OutputFormat,
    quiet: bool,
) {
    let store = match MemoryStore::from_path(source, store_path) {
        Ok(s) => s,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let probe = Probe::new(table, kind, value);
    let rt = runtime(output, quiet);
    let report = rt.block_on(run_conformance_suite(&store, &probe));

    match output {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Json => {
            let results: Vec<serde_json::Value> = report
                .results
                .iter()
                .map(|r| {
                    json!({
                        "category": r.category,
                        "name": r.name,
                        "passed": r.passed,
                        "message": r.message,
                    })
                })
                .collect();
            print_json(&json!({
                "passed": report.passed,
                "failed": report.failed,
                "total": report.total,
                "results": results,
            }));
        }
    }

    if report.failed > 0 {
        process::exit(1);
    }
}
