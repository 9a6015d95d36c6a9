use std::sync::Arc;

use anyhow::Context;
use quote_visualizer::{logging, server, Config, ConfigError, GeminiGateway, Session};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config first so RUST_LOG from .env is honoured.
    let config = Config::from_env();
    logging::init_logging()?;

    let result = run(config).await;
    if let Err(err) = &result {
        logging::report_fatal(err);
    }
    result
}

async fn run(config: Result<Config, ConfigError>) -> anyhow::Result<()> {
    let config = config.context("failed to load configuration")?;

    let gateway = Arc::new(GeminiGateway::from_config(&config));
    let session = Arc::new(Session::new(gateway));
    let app = server::router(session, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(
        addr = %config.bind_addr,
        text_model = %config.text_model,
        image_model = %config.image_model,
        "server running"
    );

    axum::serve(listener, app).await.context("server stopped")?;
    Ok(())
}
