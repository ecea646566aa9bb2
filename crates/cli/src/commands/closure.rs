use std::path::Path;
use std::process;

use crate::{print_json, report_error, runtime, OutputFormat};

pub(crate) fn cmd_closure(seed: &str, config_path: &Path, output: OutputFormat, quiet: bool) {
    let ctx = match crate::config::read_config(config_path).and_then(|c| c.engine_context()) {
        Ok(ctx) => ctx,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let rt = runtime(output, quiet);
    match rt.block_on(crossref_closure::resolve_entity_closure(&ctx, seed)) {
        Ok(closure) => match output {
            OutputFormat::Text => println!("{}", closure.to_text()),
            OutputFormat::Json => print_json(&closure.to_json()),
        },
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}
