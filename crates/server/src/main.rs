//! Cadence server binary.

use anyhow::Context;
use cadence_server::CadenceConfig;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CadenceConfig::load().context("failed to load configuration")?;

    tracing::info!("Starting Cadence server v{}", env!("CARGO_PKG_VERSION"));

    cadence_server::run_server(config).await?;

    Ok(())
}
