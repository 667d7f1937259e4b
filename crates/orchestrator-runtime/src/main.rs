//! # Ledger Orchestrator
//!
//! Entry point: load configuration, initialise logging, start the runtime,
//! wait for Ctrl-C, shut down.

use anyhow::{Context, Result};
use orchestrator_runtime::{Runtime, RuntimeConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env();

    // Initialize logging
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set subscriber")?;

    config.validate().context("invalid configuration")?;
    info!(endpoint = %config.ledger.endpoint(), "Starting ledger orchestrator");

    let runtime = Runtime::start(config)
        .await
        .context("failed to start runtime")?;

    // Wait for shutdown signal
    info!("Orchestrator running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    // Graceful shutdown
    runtime.shutdown().await;
    Ok(())
}
