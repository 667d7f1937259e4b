//! # Component Container
//!
//! Holds every component instance and wires them in dependency order:
//!
//! ```text
//! Phase 1: Ledger session (01), admin reference account unlocked
//! Phase 2: Type registry (02), signer dispatch (03), compensation (04)
//! Phase 3: Deployment orchestrator (05)
//! Phase 4: Artifact store and workflow entry points
//! ```
//!
//! All components are shared by `Arc`; none holds a back-reference.

use crate::artifacts::ArtifactStore;
use crate::container::config::RuntimeConfig;
use crate::workflows::{AdminWorkflows, WorkflowApi, WorkflowError};
use lo_01_ledger_client::{LedgerClient, LedgerError, LedgerSession};
use lo_02_type_registry::TypeRegistry;
use lo_03_signer_dispatch::Dispatcher;
use lo_04_compensation::{CompensationManager, DocumentStore};
use lo_05_deployment::DeploymentOrchestrator;
use serde::Deserialize;
use shared_types::Address;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

/// Startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] crate::container::ConfigError),

    /// Ledger unreachable or admin unlock refused.
    #[error("ledger: {0}")]
    Ledger(#[from] LedgerError),

    /// Admin keystore could not be read.
    #[error("admin keystore {}: {detail}", .path.display())]
    Keystore {
        /// Keystore path
        path: PathBuf,
        /// What went wrong
        detail: String,
    },

    /// Reference admin could not be recorded.
    #[error("admin bootstrap: {0}")]
    Bootstrap(#[from] WorkflowError),
}

#[derive(Deserialize)]
struct KeystoreReference {
    address: Address,
}

/// Admin account named by a keystore file's `address` field.
pub async fn read_keystore_address(path: &Path) -> Result<Address, StartupError> {
    let keystore_error = |detail: String| StartupError::Keystore {
        path: path.to_path_buf(),
        detail,
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| keystore_error(e.to_string()))?;
    let reference: KeystoreReference =
        serde_json::from_str(&raw).map_err(|e| keystore_error(e.to_string()))?;
    Ok(reference.address)
}

/// Container for all components.
pub struct ComponentContainer {
    /// Ledger session (01).
    pub session: Arc<LedgerSession>,
    /// Admin reference account.
    pub admin: Address,
    /// Type registry (02).
    pub registry: Arc<TypeRegistry>,
    /// Signer dispatch (03).
    pub dispatcher: Arc<Dispatcher>,
    /// Compensation manager (04).
    pub compensation: Arc<CompensationManager>,
    /// Deployment orchestrator (05).
    pub orchestrator: Arc<DeploymentOrchestrator>,
    /// Local document store.
    pub store: Arc<dyn DocumentStore>,
    /// Build artifacts.
    pub artifacts: Arc<ArtifactStore>,
    /// Deployment entry points.
    pub workflows: WorkflowApi,
    /// Admin entry points, when a role manager is configured.
    pub admins: Option<AdminWorkflows>,
}

impl ComponentContainer {
    /// Wire every component over `client` and `store`.
    #[instrument(name = "component_init", skip_all)]
    pub async fn build(
        config: &RuntimeConfig,
        client: Arc<dyn LedgerClient>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, StartupError> {
        config.validate()?;
        let registry_address = config
            .contracts
            .registry
            .ok_or(crate::container::ConfigError::MissingRegistry)?;

        // =====================================================================
        // PHASE 1: Ledger session
        // =====================================================================
        let session = LedgerSession::connect(client, config.session()).await?;
        let admin = match config.admin.account {
            Some(account) => account,
            None => read_keystore_address(&config.admin.keystore_path).await?,
        };
        session
            .unlock(
                admin,
                &config.admin.password,
                Duration::from_secs(config.admin.unlock_secs),
            )
            .await?;
        info!(admin = %admin, "  [01] Ledger session open, admin unlocked");

        // =====================================================================
        // PHASE 2: Registry, dispatch, compensation
        // =====================================================================
        let registry = Arc::new(TypeRegistry::new(Arc::clone(&session), registry_address, admin));
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&session)));
        let compensation = Arc::new(CompensationManager::new());
        info!("  [02] [03] [04] Registry, dispatch and compensation ready");

        // =====================================================================
        // PHASE 3: Orchestrator
        // =====================================================================
        let orchestrator = Arc::new(DeploymentOrchestrator::new(
            Arc::clone(&session),
            registry.clone(),
            dispatcher.clone(),
            Arc::clone(&compensation),
        ));
        info!("  [05] Deployment orchestrator ready");

        // =====================================================================
        // PHASE 4: Workflows
        // =====================================================================
        let artifacts = Arc::new(ArtifactStore::new(config.artifacts.dir.clone()));
        let workflows = WorkflowApi::new(
            orchestrator.clone(),
            dispatcher.clone(),
            Arc::clone(&artifacts),
            Arc::clone(&store),
            Arc::clone(&compensation),
        );
        let admins = match config.contracts.role_manager {
            Some(role_manager) => {
                let admins = AdminWorkflows::new(
                    Arc::clone(&session),
                    dispatcher.clone(),
                    Arc::clone(&store),
                    Arc::clone(&compensation),
                    role_manager,
                );
                admins.bootstrap(&config.admin.username, admin).await?;
                Some(admins)
            }
            None => {
                info!("No role manager configured; admin workflows disabled");
                None
            }
        };

        info!("All components initialized");
        Ok(Self {
            session,
            admin,
            registry,
            dispatcher,
            compensation,
            orchestrator,
            store,
            artifacts,
            workflows,
            admins,
        })
    }
}
