use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "quote_visualizer=info,tower_http=info";

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG`.
pub fn init_logging() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

/// Logs a fatal error with its full context chain.
pub fn report_fatal(err: &anyhow::Error) {
    tracing::error!(error = %format!("{err:#}"), "server failed");
}
