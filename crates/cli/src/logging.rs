use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `crossref_closure=debug`.
pub(crate) const LOG_ENV: &str = "CROSSREF_LOG";

/// Install the stderr subscriber. `--quiet` overrides the environment.
pub(crate) fn init(quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
