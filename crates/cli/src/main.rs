mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use crossref_storage::{KeyKind, Source};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Cross-store entity reconciliation and closure resolution.
#[derive(Parser)]
#[command(
    name = "crossref",
    version,
    about = "Cross-store entity reconciliation and closure resolution"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile legacy and current enquiry rows into one de-duplicated list
    Reconcile {
        /// JSON array of legacy rows
        #[arg(long)]
        legacy: PathBuf,
        /// JSON array of current rows
        #[arg(long)]
        current: PathBuf,
        /// Config file; only its [reconcile] section is used
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Resolve every record linked to a seed across both stores
    Closure {
        /// Instruction reference, id, email, name, or Kind:value list
        seed: String,
        /// Config file naming the stores
        #[arg(long, default_value = "crossref.toml")]
        config: PathBuf,
    },

    /// Run the adapter conformance suite against a JSON store file
    CheckStore {
        /// Path to the JSON store file
        store: PathBuf,
        /// Which store the file holds
        #[arg(long, default_value = "legacy", value_parser = parse_source)]
        source: Source,
        /// Table holding the probe value
        #[arg(long)]
        table: String,
        /// Kind of the probe value (e.g. Email, ProspectId)
        #[arg(long)]
        kind: KeyKind,
        /// A value known to exist in the table, as a user would type it
        #[arg(long)]
        value: String,
    },
}

fn parse_source(s: &str) -> Result<Source, String> {
    match s.to_ascii_lowercase().as_str() {
        "legacy" => Ok(Source::Legacy),
        "current" => Ok(Source::Current),
        other => Err(format!("unknown store '{}' (expected legacy or current)", other)),
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.quiet);

    match cli.command {
        Commands::Reconcile {
            legacy,
            current,
            config,
        } => {
            commands::reconcile::cmd_reconcile(
                &legacy,
                &current,
                config.as_deref(),
                cli.output,
                cli.quiet,
            );
        }
        Commands::Closure { seed, config } => {
            commands::closure::cmd_closure(&seed, &config, cli.output, cli.quiet);
        }
        Commands::CheckStore {
            store,
            source,
            table,
            kind,
            value,
        } => {
            commands::check_store::cmd_check_store(
                &store, source, &table, kind, &value, cli.output, cli.quiet,
            );
        }
    }
}

/// Build the async runtime, or exit.
pub(crate) fn runtime(output: OutputFormat, quiet: bool) -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("failed to create tokio runtime: {}", e),
                output,
                quiet,
            );
            process::exit(1);
        }
    }
}

pub(crate) fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("serialization error: {}", e))
    );
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
