//! # End-to-End Deployment Scenarios
//!
//! Ledger client, type registry, signer dispatch, compensation and the
//! orchestrator working together over the in-memory ledger:
//!
//! 1. Delegated deploy of a fresh type at the default version
//! 2. Confirmed transaction without a matching event, with compensation
//! 3. External signer: unsigned transaction, then resume via signed payload
//! 4. Concurrent deploys from one managed account, warm and cold types
//! 5. Confirmation faults: hidden receipts, late inclusion, duplicate and
//!    collapsed registry events

use super::fixtures::{example, Stack, ADMIN, REGISTRY};
use lo_01_ledger_client::OfflineSigner;
use lo_02_type_registry::{type_id_for, TypeRegistryApi, DEFAULT_VERSION};
use lo_03_signer_dispatch::{DispatchOutcome, SignerDispatchApi};
use lo_04_compensation::{CommittedStep, DeleteDocumentAction, DocumentStore};
use lo_05_deployment::{DeployError, DeploymentApi, ErrorKind, Progress, ResumeOutcome};
use serde_json::json;
use shared_types::{Address, ContractCall, FeePolicy, UnsignedTransaction, DEFAULT_GAS_LIMIT};
use std::sync::Arc;

// =============================================================================
// DELEGATED DEPLOYMENT
// =============================================================================

#[tokio::test]
async fn test_fresh_type_deploys_at_default_version() {
    let stack = Stack::new().await;

    let outcome = stack.orchestrator.deploy(example(ADMIN)).await.unwrap();
    let record = outcome.record().unwrap();

    assert!(!record.proxy.is_zero());
    assert!(!record.logic.is_zero());
    assert_ne!(record.proxy, record.logic);
    assert_eq!(record.owner, ADMIN);
    assert_eq!(record.type_id, type_id_for("example"));
    assert_eq!(record.version.packed(), 0x0001);

    let resolved = stack.registry.resolve_type("example").await.unwrap();
    assert_eq!(resolved.version, DEFAULT_VERSION);
    assert_eq!(stack.registry.record(record.proxy).await.unwrap().logic, record.logic);
}

// =============================================================================
// CONFIRMED BUT UNCORRELATED
// =============================================================================

#[tokio::test]
async fn test_missing_event_rolls_back_earlier_steps() {
    let stack = Stack::warmed().await;
    stack
        .store
        .save("deployments", "earlier", json!({"step": 1}))
        .await
        .unwrap();

    let mut context = stack.compensation.begin("suite");
    context.record(CommittedStep::new(
        "deployments/earlier",
        ADMIN,
        Arc::new(DeleteDocumentAction::new(stack.store.clone(), "deployments", "earlier")),
    ));

    stack.emulator.set_suppress_events(true);
    let err = stack
        .orchestrator
        .deploy_in(example(ADMIN), context)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DeployUnconfirmed);
    let report = err.compensation().unwrap();
    assert_eq!(report.results.len(), 1);
    assert!(report.all_succeeded());
    assert_eq!(stack.store.count("deployments"), 0);
}

#[tokio::test]
async fn test_context_survives_successful_step() {
    let stack = Stack::warmed().await;
    let context = stack.compensation.begin("suite");

    let Progress::Completed { record, context } = stack
        .orchestrator
        .deploy_in(example(ADMIN), context)
        .await
        .unwrap()
    else {
        panic!("delegated deploy paused");
    };
    assert!(record.has_distinct_addresses());
    assert!(context.is_empty());
    context.discard();
}

// =============================================================================
// EXTERNAL SIGNER
// =============================================================================

#[tokio::test]
async fn test_external_dispatch_uses_default_fees_and_current_count() {
    let stack = Stack::warmed().await;
    let signer = OfflineSigner::random();

    // One transaction sent out of band moves the account's count to 1.
    let transfer = ContractCall::new(Address([0x77; 20]), vec![0x01]);
    let sent = UnsignedTransaction::assemble(signer.address(), &transfer, &FeePolicy::default(), 0);
    let forwarded = stack
        .orchestrator
        .resume(&signer.sign(&sent).unwrap())
        .await
        .unwrap();
    assert!(matches!(forwarded, ResumeOutcome::Untracked(receipt) if receipt.succeeded()));

    let call = ContractCall::new(REGISTRY, vec![0xAB]);
    let outcome = stack
        .dispatcher
        .dispatch(signer.address(), &call, &FeePolicy::default())
        .await
        .unwrap();
    let DispatchOutcome::PendingSignature(tx) = outcome else {
        panic!("external account was dispatched directly");
    };
    assert_eq!(tx.nonce, 1);
    assert_eq!(tx.gas_limit, DEFAULT_GAS_LIMIT);
    assert!(tx.gas_price.is_zero());
    assert_eq!(stack.ledger.mined_from(signer.address()).len(), 1);
}

#[tokio::test]
async fn test_signed_payload_resumes_same_workflow() {
    let stack = Stack::warmed().await;
    let signer = OfflineSigner::random();

    let outcome = stack
        .orchestrator
        .deploy(example(signer.address()))
        .await
        .unwrap();
    let tx = outcome.unsigned().unwrap().clone();
    assert_eq!(tx.from, signer.address());
    assert_eq!(tx.to, REGISTRY);
    assert!(stack.ledger.mined_from(signer.address()).is_empty());

    let resumed = stack
        .orchestrator
        .resume(&signer.sign(&tx).unwrap())
        .await
        .unwrap();
    let ResumeOutcome::Completed { workflow_id, record } = resumed else {
        panic!("payload was not matched to its workflow");
    };
    assert_eq!(workflow_id, outcome.workflow_id());
    assert_eq!(record.owner, signer.address());
    assert!(record.has_distinct_addresses());
    assert!(stack.orchestrator.pending().is_empty());
}

#[tokio::test]
async fn test_payload_signed_by_other_key_is_not_resumed() {
    let stack = Stack::warmed().await;
    let owner = OfflineSigner::random();
    let intruder = OfflineSigner::random();

    let outcome = stack.orchestrator.deploy(example(owner.address())).await.unwrap();
    let payload = intruder.sign(outcome.unsigned().unwrap()).unwrap();

    assert!(stack.orchestrator.resume(&payload).await.is_err());
    assert_eq!(stack.orchestrator.pending().len(), 1);
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[tokio::test]
async fn test_concurrent_deploys_get_increasing_nonces() {
    let stack = Stack::warmed().await;
    let before = stack.ledger.mined_from(ADMIN).len();

    let (first, second) = tokio::join!(
        stack.orchestrator.deploy(example(ADMIN)),
        stack.orchestrator.deploy(example(ADMIN)),
    );
    let first = first.unwrap();
    let second = second.unwrap();
    assert_ne!(first.record().unwrap().proxy, second.record().unwrap().proxy);

    let mined = stack.ledger.mined_from(ADMIN);
    assert_eq!(mined.len(), before + 2);
    assert!(mined.windows(2).all(|pair| pair[0].nonce < pair[1].nonce));
}

#[tokio::test]
async fn test_concurrent_first_deploys_of_new_type_both_succeed() {
    let stack = Stack::new().await;
    stack.ledger.set_hold_mining(true);

    let (first, second, ()) = tokio::join!(
        stack.orchestrator.deploy(example(ADMIN)),
        stack.orchestrator.deploy(example(ADMIN)),
        async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            stack.ledger.mine_held();
        },
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert_eq!(stack.emulator.type_count(), 1);
    assert_ne!(first.record().unwrap().proxy, second.record().unwrap().proxy);
    assert_eq!(
        first.record().unwrap().type_id,
        second.record().unwrap().type_id
    );
}

// =============================================================================
// CONFIRMATION FAULTS
// =============================================================================

#[tokio::test]
async fn test_hidden_receipt_recovered_from_events() {
    let stack = Stack::warmed().await;
    stack.ledger.set_hide_receipts(true);

    let outcome = stack.orchestrator.deploy(example(ADMIN)).await.unwrap();
    assert!(outcome.record().unwrap().has_distinct_addresses());
}

#[tokio::test]
async fn test_late_inclusion_does_not_reuse_nonce() {
    let stack = Stack::warmed().await;
    stack.ledger.set_hold_mining(true);

    let err = stack.orchestrator.deploy(example(ADMIN)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LedgerTimeout);

    stack.ledger.mine_held();
    stack.ledger.set_hold_mining(false);
    stack.orchestrator.deploy(example(ADMIN)).await.unwrap();

    let mined = stack.ledger.mined_from(ADMIN);
    assert!(mined.windows(2).all(|pair| pair[0].nonce < pair[1].nonce));
}

#[tokio::test]
async fn test_duplicate_events_are_unconfirmed() {
    let stack = Stack::warmed().await;
    stack.emulator.set_duplicate_events(true);

    let err = stack.orchestrator.deploy(example(ADMIN)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeployUnconfirmed);
    assert!(matches!(
        err.root_cause(),
        DeployError::DeployUnconfirmed { matches: 2, .. }
    ));
}

#[tokio::test]
async fn test_collapsed_addresses_are_never_reported_as_success() {
    let stack = Stack::warmed().await;
    stack.emulator.set_collapse_addresses(true);

    let err = stack.orchestrator.deploy(example(ADMIN)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeployInvariantViolation);
    assert!(matches!(
        err.root_cause(),
        DeployError::DeployInvariantViolation { proxy, logic, .. } if proxy == logic
    ));
}
