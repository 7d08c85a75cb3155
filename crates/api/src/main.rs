//! Wellness Session Server - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, ServerConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1).or_else(|| std::env::var("WELLNESS_SERVER_CONFIG").ok());
    let config = ServerConfig::load(path.as_deref()).context("loading server configuration")?;
    init_logging(&config.logging)?;

    info!("=== Wellness Server v{} ===", env!("CARGO_PKG_VERSION"));
    run_server(config).await?;

    Ok(())
}
