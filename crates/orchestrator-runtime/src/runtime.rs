//! # Runtime
//!
//! Owns the component container and the background sweeper that expires
//! abandoned external-signature workflows.
//!
//! ## Lifecycle
//!
//! 1. `start` validates the configuration and wires the components
//! 2. The sweeper runs every `workflows.sweep_interval_secs`
//! 3. `shutdown` stops the sweeper and closes the ledger session

use crate::container::{ComponentContainer, RuntimeConfig, StartupError};
use crate::workflows::{AdminWorkflows, WorkflowApi};
use lo_01_ledger_client::{JsonRpcLedgerClient, LedgerClient};
use lo_04_compensation::{DocumentStore, InMemoryDocumentStore};
use lo_05_deployment::DeploymentApi;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Running orchestrator.
pub struct Runtime {
    config: RuntimeConfig,
    container: Arc<ComponentContainer>,
    shutdown_tx: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl Runtime {
    /// Start against the configured JSON-RPC endpoint with an in-memory
    /// document store.
    pub async fn start(config: RuntimeConfig) -> Result<Self, StartupError> {
        config.validate()?;
        let client = JsonRpcLedgerClient::new(config.ledger.endpoint(), config.ledger.request_timeout())?;
        info!(endpoint = %client.endpoint(), "[runtime] Ledger endpoint");
        Self::start_with(config, Arc::new(client), Arc::new(InMemoryDocumentStore::new())).await
    }

    /// Start over an explicit ledger client and document store.
    pub async fn start_with(
        config: RuntimeConfig,
        client: Arc<dyn LedgerClient>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, StartupError> {
        info!("===========================================");
        info!("  Ledger Orchestrator Runtime v{}", crate::VERSION);
        info!("===========================================");

        let container = Arc::new(ComponentContainer::build(&config, client, store).await?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sweeper = spawn_sweeper(&config, Arc::clone(&container), shutdown_rx);

        info!(
            pending_ttl_secs = config.workflows.pending_ttl_secs,
            sweep_interval_secs = config.workflows.sweep_interval_secs,
            "[runtime] Ready"
        );
        Ok(Self {
            config,
            container,
            shutdown_tx,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Component container.
    pub fn container(&self) -> &Arc<ComponentContainer> {
        &self.container
    }

    /// Deployment entry points.
    pub fn workflows(&self) -> &WorkflowApi {
        &self.container.workflows
    }

    /// Admin entry points, when a role manager is configured.
    pub fn admins(&self) -> Option<&AdminWorkflows> {
        self.container.admins.as_ref()
    }

    /// Stop the sweeper and close the ledger session.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        let sweeper = self.sweeper.lock().take();
        if let Some(handle) = sweeper {
            if let Err(e) = handle.await {
                warn!(error = %e, "[runtime] Sweeper ended abnormally");
            }
        }

        let paused = self.container.orchestrator.pending().len();
        if paused > 0 {
            warn!(paused, "[runtime] Paused workflows dropped at shutdown");
        }
        self.container.session.shutdown();
        info!("Shutdown complete");
    }
}

fn spawn_sweeper(
    config: &RuntimeConfig,
    container: Arc<ComponentContainer>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let ttl = config.workflows.pending_ttl();
    let mut interval = tokio::time::interval(config.workflows.sweep_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let expired = container.orchestrator.sweep_abandoned(ttl).await;
                    debug!(expired, "[runtime] Sweep finished");
                }
                _ = shutdown_rx.changed() => {
                    info!("[runtime] Sweeper received shutdown signal");
                    break;
                }
            }
        }
    })
}
