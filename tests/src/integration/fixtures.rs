//! Component stack wired over the in-memory ledger, the way the runtime
//! container wires it over a live node.

use lo_01_ledger_client::{InMemoryLedger, LedgerSession, SessionConfig};
use lo_02_type_registry::{RegistryEmulator, TypeRegistry};
use lo_03_signer_dispatch::Dispatcher;
use lo_04_compensation::{CompensationManager, InMemoryDocumentStore};
use lo_05_deployment::{DeployRequest, DeploymentApi, DeploymentOrchestrator};
use shared_types::Address;
use std::sync::Arc;
use std::time::Duration;

/// Server-managed admin account.
pub const ADMIN: Address = Address([0xAD; 20]);
/// Registry contract address.
pub const REGISTRY: Address = Address([0x5E; 20]);
/// Minimal creation bytecode.
pub const CODE: [u8; 4] = [0x60, 0x80, 0x60, 0x40];

pub struct Stack {
    pub ledger: Arc<InMemoryLedger>,
    pub emulator: Arc<RegistryEmulator>,
    pub session: Arc<LedgerSession>,
    pub registry: Arc<TypeRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub compensation: Arc<CompensationManager>,
    pub store: Arc<InMemoryDocumentStore>,
    pub orchestrator: DeploymentOrchestrator,
}

impl Stack {
    pub async fn new() -> Self {
        let ledger = Arc::new(InMemoryLedger::new().with_managed_account(ADMIN));
        let emulator = Arc::new(RegistryEmulator::new());
        ledger.register_emulator(REGISTRY, emulator.clone());

        let config = SessionConfig {
            confirmation_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
            ..SessionConfig::default()
        };
        let session = LedgerSession::connect(ledger.clone(), config).await.unwrap();
        let registry = Arc::new(TypeRegistry::new(session.clone(), REGISTRY, ADMIN));
        let dispatcher = Arc::new(Dispatcher::new(session.clone()));
        let compensation = Arc::new(CompensationManager::new());
        let orchestrator = DeploymentOrchestrator::new(
            session.clone(),
            registry.clone(),
            dispatcher.clone(),
            compensation.clone(),
        );

        Self {
            ledger,
            emulator,
            session,
            registry,
            dispatcher,
            compensation,
            store: Arc::new(InMemoryDocumentStore::new()),
            orchestrator,
        }
    }

    /// Stack with the `example` type already registered by one deployment.
    pub async fn warmed() -> Self {
        let stack = Self::new().await;
        stack
            .orchestrator
            .deploy(example(ADMIN))
            .await
            .unwrap();
        stack
    }
}

/// Deploy request for the `example` type.
pub fn example(account: Address) -> DeployRequest {
    DeployRequest::new("Example", CODE.to_vec(), account, "example")
}
