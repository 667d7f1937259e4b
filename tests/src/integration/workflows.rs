//! # Runtime Workflow Tests
//!
//! The orchestrator runtime started over the in-memory ledger with a
//! directory of build artifacts, driven only through its entry points.

use lo_01_ledger_client::{InMemoryLedger, OfflineSigner};
use lo_02_type_registry::RegistryEmulator;
use lo_04_compensation::InMemoryDocumentStore;
use lo_05_deployment::ErrorKind;
use orchestrator_runtime::workflows::DEPLOYMENTS;
use orchestrator_runtime::{DeployCommand, RoleManagerEmulator, Runtime, RuntimeConfig};
use serde_json::json;
use shared_types::{Address, Token};
use std::path::Path;
use std::sync::Arc;

const ADMIN: Address = Address([0xAD; 20]);
const ALICE: Address = Address([0xA1; 20]);
const REGISTRY: Address = Address([0x5E; 20]);
const ROLES: Address = Address([0x40; 20]);
const PASSWORD: &str = "admin-pass";

struct Node {
    ledger: Arc<InMemoryLedger>,
    roles: Arc<RoleManagerEmulator>,
    store: Arc<InMemoryDocumentStore>,
    runtime: Runtime,
    _artifacts: tempfile::TempDir,
}

fn write_artifacts(dir: &Path) {
    let artifacts = [
        (
            "Counter",
            json!({"contractName": "Counter", "abi": [], "bytecode": "0x608060405234801561001057600080fd5b50"}),
        ),
        (
            "CounterV2",
            json!({"contractName": "Counter", "abi": [], "bytecode": "0x608060405234801561001057600080fd5b5061"}),
        ),
        (
            "Wallet",
            json!({
                "contractName": "Wallet",
                "abi": [
                    {"type": "function", "name": "initialize", "stateMutability": "nonpayable",
                     "inputs": [{"name": "owner", "type": "address"}], "outputs": []}
                ],
                "bytecode": "0x6080604052600a"
            }),
        ),
    ];
    for (name, contents) in artifacts {
        std::fs::write(dir.join(format!("{name}.json")), contents.to_string()).unwrap();
    }
}

async fn start() -> Node {
    let artifacts = tempfile::tempdir().unwrap();
    write_artifacts(artifacts.path());

    let ledger = Arc::new(
        InMemoryLedger::new()
            .with_locked_account(ADMIN, PASSWORD)
            .with_managed_account(ALICE),
    );
    ledger.register_emulator(REGISTRY, Arc::new(RegistryEmulator::new()));
    let roles = Arc::new(RoleManagerEmulator::new(ADMIN));
    ledger.register_emulator(ROLES, roles.clone());
    let store = Arc::new(InMemoryDocumentStore::new());

    let mut config = RuntimeConfig::default();
    config.admin.account = Some(ADMIN);
    config.admin.password = PASSWORD.into();
    config.contracts.registry = Some(REGISTRY);
    config.contracts.role_manager = Some(ROLES);
    config.artifacts.dir = artifacts.path().to_path_buf();
    config.confirmation.timeout_secs = 1;
    config.confirmation.poll_interval_ms = 5;
    config.workflows.sweep_interval_secs = 3600;

    let runtime = Runtime::start_with(config, ledger.clone(), store.clone())
        .await
        .unwrap();
    Node {
        ledger,
        roles,
        store,
        runtime,
        _artifacts: artifacts,
    }
}

// =============================================================================
// DEPLOY AND UPGRADE
// =============================================================================

#[tokio::test]
async fn test_deploy_then_upgrade_keeps_proxy() {
    let node = start().await;
    let workflows = node.runtime.workflows();

    let deployed = workflows
        .initiate_deploy(DeployCommand::new("Counter", ADMIN))
        .await;
    assert!(deployed.success, "{}", deployed.message);
    let before = deployed.record.unwrap();

    let upgraded = workflows
        .initiate_upgrade("CounterV2", before.proxy, ADMIN)
        .await;
    assert!(upgraded.success, "{}", upgraded.message);
    let after = upgraded.record.unwrap();
    assert_eq!(after.proxy, before.proxy);
    assert_ne!(after.logic, before.logic);
    assert_ne!(after.logic, after.proxy);

    node.runtime.shutdown().await;
}

#[tokio::test]
async fn test_initializer_arguments_are_checked_before_submission() {
    let node = start().await;
    let workflows = node.runtime.workflows();

    let wrong = workflows
        .initiate_deploy(
            DeployCommand::new("Wallet", ADMIN).with_init_args(vec![Token::Bool(true), Token::Bool(false)]),
        )
        .await;
    assert!(!wrong.success);
    assert_eq!(wrong.error_kind, Some(ErrorKind::InvalidRequest));
    assert!(node.ledger.mined_from(ADMIN).is_empty());

    let ok = workflows
        .initiate_deploy(DeployCommand::new("Wallet", ADMIN).with_init_args(vec![Token::Address(ADMIN)]))
        .await;
    assert!(ok.success, "{}", ok.message);
}

#[tokio::test]
async fn test_external_upgrade_waits_for_signature() {
    let node = start().await;
    let workflows = node.runtime.workflows();
    let signer = OfflineSigner::random();

    let paused = workflows
        .initiate_deploy(DeployCommand::new("Counter", signer.address()))
        .await;
    let payload = signer.sign(paused.unsigned_transaction.as_ref().unwrap()).unwrap();
    let deployed = workflows.submit_signed_payload(&payload).await;
    let proxy = deployed.record.unwrap().proxy;

    let upgrade = workflows
        .initiate_upgrade("CounterV2", proxy, signer.address())
        .await;
    assert!(upgrade.awaiting_signature(), "{}", upgrade.message);
    assert_eq!(upgrade.unsigned_transaction.as_ref().unwrap().nonce, 1);

    let payload = signer.sign(upgrade.unsigned_transaction.as_ref().unwrap()).unwrap();
    let upgraded = workflows.submit_signed_payload(&payload).await;
    assert!(upgraded.success, "{}", upgraded.message);
    assert_eq!(upgraded.workflow_id, upgrade.workflow_id);
    assert_eq!(upgraded.record.unwrap().proxy, proxy);
}

// =============================================================================
// RESPONSES
// =============================================================================

#[tokio::test]
async fn test_suite_response_serializes_camel_case() {
    let node = start().await;
    let response = node
        .runtime
        .workflows()
        .deploy_suite(
            ADMIN,
            vec![
                DeployCommand::new("Counter", ADMIN),
                DeployCommand::new("Wallet", ADMIN).with_init_args(vec![Token::Address(ADMIN)]),
            ],
        )
        .await;
    assert!(response.success, "{}", response.message);
    assert_eq!(node.store.count(DEPLOYMENTS), 2);

    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["success"], true);
    assert!(body["workflowId"].is_string());
    assert_eq!(body["records"].as_array().unwrap().len(), 2);
    assert!(body["records"][0]["typeId"].is_string());
    assert!(body.get("unsignedTransaction").is_none());
    assert!(body.get("compensation").is_none());
}

#[tokio::test]
async fn test_suite_of_unknown_artifact_reports_kind() {
    let node = start().await;
    let response = node
        .runtime
        .workflows()
        .deploy_suite(
            ADMIN,
            vec![
                DeployCommand::new("Counter", ADMIN),
                DeployCommand::new("Missing", ADMIN),
            ],
        )
        .await;

    let body = serde_json::to_value(&response).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["errorKind"], "InvalidRequest");
    assert_eq!(body["compensation"]["results"].as_array().unwrap().len(), 1);
    assert_eq!(node.store.count(DEPLOYMENTS), 0);
}

// =============================================================================
// ADMINS
// =============================================================================

#[tokio::test]
async fn test_granted_admin_can_grant_and_revoke() {
    let node = start().await;
    let admins = node.runtime.admins().unwrap();
    let bob = Address([0xB0; 20]);

    assert!(admins.add_admin(ADMIN, "alice", ALICE).await.success);
    let by_alice = admins.add_admin(ALICE, "bob", bob).await;
    assert!(by_alice.success, "{}", by_alice.message);
    assert_eq!(by_alice.admin.unwrap().added_by, Some(ALICE));
    assert_eq!(node.roles.admin_count(), 3);

    let alice_self = admins.remove_admin(ALICE, "alice").await;
    assert!(!alice_self.success);

    let revoked = admins.remove_admin(ALICE, "bob").await;
    assert!(revoked.success, "{}", revoked.message);
    assert!(!node.roles.is_admin(bob));
    assert_eq!(node.roles.admin_count(), 2);
}

#[tokio::test]
async fn test_unmanaged_admin_cannot_act() {
    let node = start().await;
    let admins = node.runtime.admins().unwrap();
    let carol = OfflineSigner::random().address();

    assert!(admins.add_admin(ADMIN, "carol", carol).await.success);
    let response = admins.add_admin(carol, "dave", Address([0xDA; 20])).await;
    assert_eq!(response.error_kind, Some(ErrorKind::SignerUnavailable));
    assert!(admins.find("dave").await.unwrap().is_none());
}
