//! # Deployment Orchestrator Service
//!
//! ```text
//! Building ──► resolve/register type, random salt, encode registry call
//! Submitting ──► classify signer ─┬─ delegated: submit + wait
//!                                 └─ external:  park (account, nonce), hand back unsigned tx
//! AwaitingConfirmation ──► receipt, or timeout ─► re-query events from submission block
//! Verifying ──► exactly one Deployed/Upgraded event for (owner, type, salt)
//!               addresses distinct
//! Registered ──► read record, record caller compensation
//! ```
//!
//! Nothing is compensated for a failure before the transaction reached the
//! ledger unless the surrounding workflow already committed steps. Every
//! failure after submission runs compensation before it is returned.

use crate::domain::{
    Correlation, DeployError, DeployRequest, DeploymentKind, DeploymentOutcome, DeploymentRun,
    DeploymentState, InFlight, PendingWorkflows, Progress, ResumeOutcome, UpgradeRequest,
};
use crate::ports::DeploymentApi;
use async_trait::async_trait;
use lo_01_ledger_client::{LedgerError, LedgerSession};
use lo_02_type_registry::{
    ComponentType, RegistryRecord, TypeRegistryApi, DEPLOYED, DEPLOY_CONTRACT, REGISTRY_ABI,
    UPGRADED, UPGRADE_CONTRACT,
};
use lo_03_signer_dispatch::{DispatchError, DispatchOutcome, SignerDispatchApi};
use lo_04_compensation::{CommittedStep, CompensationManager, WorkflowContext};
use shared_types::{Address, ArgFilter, ContractCall, Hash, Receipt, Token};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Orchestrator counters.
#[derive(Debug, Default)]
pub struct OrchestratorStats {
    /// Runs started.
    pub started: AtomicU64,
    /// Runs that reached `Registered`.
    pub registered: AtomicU64,
    /// Runs parked for an external signature.
    pub paused: AtomicU64,
    /// Parked runs resumed by a signed payload.
    pub resumed: AtomicU64,
    /// Runs that failed.
    pub failed: AtomicU64,
    /// Parked runs dropped by the sweeper.
    pub expired: AtomicU64,
}

/// Deployment Orchestrator.
pub struct DeploymentOrchestrator {
    session: Arc<LedgerSession>,
    registry: Arc<dyn TypeRegistryApi>,
    dispatcher: Arc<dyn SignerDispatchApi>,
    compensation: Arc<CompensationManager>,
    pending: PendingWorkflows,
    stats: OrchestratorStats,
}

impl DeploymentOrchestrator {
    /// Orchestrator over its collaborators.
    pub fn new(
        session: Arc<LedgerSession>,
        registry: Arc<dyn TypeRegistryApi>,
        dispatcher: Arc<dyn SignerDispatchApi>,
        compensation: Arc<CompensationManager>,
    ) -> Self {
        Self {
            session,
            registry,
            dispatcher,
            compensation,
            pending: PendingWorkflows::new(),
            stats: OrchestratorStats::default(),
        }
    }

    /// Orchestrator counters.
    pub fn stats(&self) -> &OrchestratorStats {
        &self.stats
    }

    /// Paused workflows.
    pub fn pending(&self) -> &PendingWorkflows {
        &self.pending
    }

    /// Compensation manager shared with the caller's workflows.
    pub fn compensation(&self) -> &Arc<CompensationManager> {
        &self.compensation
    }

    // =========================================================================
    // BUILDING
    // =========================================================================

    async fn build_deploy(
        &self,
        request: &DeployRequest,
    ) -> Result<(ContractCall, ComponentType, Hash), DeployError> {
        let component_type = self.registry.resolve_or_register(&request.type_name).await?;
        let salt = random_salt();
        let data = REGISTRY_ABI.function(DEPLOY_CONTRACT)?.encode_call(&[
            Token::Bytes(request.bytecode.to_vec()),
            Token::Bytes(request.init_data.to_vec()),
            Token::word(salt),
            Token::word(component_type.type_id),
        ])?;
        debug!(
            type_name = %component_type.name,
            version = %component_type.version,
            salt = %salt,
            "[lo-05] Deploy call built"
        );
        Ok((
            ContractCall::new(self.registry.address(), data),
            component_type,
            salt,
        ))
    }

    async fn build_upgrade(
        &self,
        request: &UpgradeRequest,
    ) -> Result<(ContractCall, Address, Hash), DeployError> {
        let current = self.registry.record(request.proxy).await?;
        if current.owner != request.account {
            return Err(DeployError::InvalidRequest(format!(
                "{} does not own {}",
                request.account, request.proxy
            )));
        }
        let salt = random_salt();
        let data = REGISTRY_ABI.function(UPGRADE_CONTRACT)?.encode_call(&[
            Token::Address(request.proxy),
            Token::Bytes(request.bytecode.to_vec()),
            Token::word(salt),
        ])?;
        Ok((
            ContractCall::new(self.registry.address(), data),
            current.logic,
            salt,
        ))
    }

    // =========================================================================
    // SUBMITTING
    // =========================================================================

    async fn submit(&self, mut flight: InFlight, call: ContractCall) -> Result<Progress, DeployError> {
        if let Err(err) = flight.run.advance(DeploymentState::Submitting) {
            return Err(self.abort(flight.run, flight.context, err).await);
        }
        let decision = match self.dispatcher.classify(flight.account).await {
            Ok(decision) => decision,
            Err(err) => return Err(self.abort(flight.run, flight.context, err.into()).await),
        };

        let fees = *self.session.fees();
        match self
            .dispatcher
            .dispatch_with(flight.account, decision, &call, &fees)
            .await
        {
            Ok(DispatchOutcome::PendingSignature(transaction)) => {
                if let Err(err) = flight.run.advance(DeploymentState::AwaitingConfirmation) {
                    self.session.release_nonce(transaction.from, transaction.nonce).await;
                    return Err(self.abort(flight.run, flight.context, err).await);
                }
                let workflow_id = flight.run.workflow_id();
                info!(
                    workflow_id = %workflow_id,
                    account = %transaction.from,
                    nonce = transaction.nonce,
                    "[lo-05] Awaiting external signature"
                );
                self.pending.park(transaction.from, transaction.nonce, flight);
                self.stats.paused.fetch_add(1, Ordering::Relaxed);
                Ok(Progress::AwaitingSignature {
                    workflow_id,
                    transaction,
                })
            }
            Ok(DispatchOutcome::Submitted(receipt)) => self
                .settle(flight, Ok(receipt))
                .await
                .map(|(record, context)| Progress::Completed { record, context }),
            Err(err) if err.was_submitted() => self
                .settle(flight, Err(err))
                .await
                .map(|(record, context)| Progress::Completed { record, context }),
            Err(err) => Err(self.abort(flight.run, flight.context, err.into()).await),
        }
    }

    // =========================================================================
    // CONFIRMATION & VERIFICATION
    // =========================================================================

    /// Finish a run whose transaction reached the ledger.
    async fn settle(
        &self,
        mut flight: InFlight,
        confirmation: Result<Receipt, DispatchError>,
    ) -> Result<(RegistryRecord, WorkflowContext), DeployError> {
        match self.verify(&mut flight, confirmation).await {
            Ok(record) => {
                if let Some(action) = flight.compensation.take() {
                    flight.context.record(CommittedStep::new(
                        record.proxy.to_string(),
                        flight.account,
                        action,
                    ));
                }
                self.stats.registered.fetch_add(1, Ordering::Relaxed);
                info!(
                    workflow_id = %flight.run.workflow_id(),
                    kind = %flight.run.kind(),
                    proxy = %record.proxy,
                    logic = %record.logic,
                    owner = %record.owner,
                    "[lo-05] Component registered"
                );
                Ok((record, flight.context))
            }
            Err(cause) => {
                flight.run.fail();
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    workflow_id = %flight.run.workflow_id(),
                    kind = %flight.run.kind(),
                    error = %cause,
                    "[lo-05] Submitted run failed, compensating"
                );
                let report = self.compensation.compensate(flight.context).await;
                Err(DeployError::compensated(cause, report))
            }
        }
    }

    async fn verify(
        &self,
        flight: &mut InFlight,
        confirmation: Result<Receipt, DispatchError>,
    ) -> Result<RegistryRecord, DeployError> {
        if flight.run.state() == DeploymentState::Submitting {
            flight.run.advance(DeploymentState::AwaitingConfirmation)?;
        }

        let (from_block, to_block, timeout) = match confirmation {
            Ok(receipt) => (receipt.block_number, receipt.block_number, None),
            Err(DispatchError::Confirmation {
                handle,
                submitted_at_block,
                source: source @ LedgerError::Timeout { .. },
            }) => {
                let head = self.session.block_number().await?;
                warn!(
                    tx_hash = %handle.hash,
                    from_block = submitted_at_block,
                    to_block = head,
                    "[lo-05] Confirmation timed out, correlating by event"
                );
                (submitted_at_block, head, Some(source))
            }
            Err(err) => return Err(err.into()),
        };

        flight.run.advance(DeploymentState::Verifying)?;
        let proxy = match (self.correlate(flight, from_block, to_block).await, timeout) {
            (Ok(proxy), _) => proxy,
            (Err(DeployError::DeployUnconfirmed { .. }), Some(timeout)) => {
                return Err(DeployError::Ledger(timeout));
            }
            (Err(err), _) => return Err(err),
        };

        let record = self.registry.record(proxy).await?;
        flight.run.advance(DeploymentState::Registered)?;
        Ok(record)
    }

    /// Find the registry event for this run and check its addresses.
    async fn correlate(
        &self,
        flight: &InFlight,
        from_block: u64,
        to_block: u64,
    ) -> Result<Address, DeployError> {
        let (name, filter) = match &flight.correlation {
            Correlation::Deploy { component_type } => (
                DEPLOYED,
                ArgFilter::any()
                    .wildcard()
                    .wildcard()
                    .exact(flight.account)
                    .exact(Token::word(component_type.type_id))
                    .exact(Token::word(flight.salt)),
            ),
            Correlation::Upgrade { proxy, .. } => (
                UPGRADED,
                ArgFilter::any()
                    .exact(*proxy)
                    .wildcard()
                    .wildcard()
                    .exact(flight.account)
                    .wildcard()
                    .wildcard()
                    .exact(Token::word(flight.salt)),
            ),
        };

        let descriptor = REGISTRY_ABI.event(name)?;
        let events = self
            .session
            .query_events(self.registry.address(), descriptor, &filter, from_block, to_block)
            .await?;
        let [event] = events.as_slice() else {
            return Err(DeployError::DeployUnconfirmed {
                event: name,
                matches: events.len(),
                from_block,
                to_block,
            });
        };

        let malformed = || LedgerError::Decode(format!("{name} event without addresses"));
        match &flight.correlation {
            Correlation::Deploy { .. } => {
                let proxy = event.address_arg(0).ok_or_else(malformed)?;
                let logic = event.address_arg(1).ok_or_else(malformed)?;
                if proxy == logic {
                    return Err(DeployError::DeployInvariantViolation {
                        proxy,
                        logic,
                        detail: "proxy equals logic",
                    });
                }
                Ok(proxy)
            }
            Correlation::Upgrade {
                proxy,
                previous_logic,
            } => {
                let old_logic = event.address_arg(1).ok_or_else(malformed)?;
                let new_logic = event.address_arg(2).ok_or_else(malformed)?;
                let detail = if old_logic == new_logic {
                    Some("new logic equals old logic")
                } else if new_logic == *proxy {
                    Some("new logic equals proxy")
                } else if old_logic == *proxy {
                    Some("old logic equals proxy")
                } else {
                    None
                };
                if let Some(detail) = detail {
                    return Err(DeployError::DeployInvariantViolation {
                        proxy: *proxy,
                        logic: new_logic,
                        detail,
                    });
                }
                if old_logic != *previous_logic {
                    warn!(
                        proxy = %proxy,
                        expected = %previous_logic,
                        actual = %old_logic,
                        "[lo-05] Proxy was upgraded concurrently"
                    );
                }
                Ok(*proxy)
            }
        }
    }

    // =========================================================================
    // FAILURE
    // =========================================================================

    /// Fail a run before its transaction reached the ledger.
    async fn abort(
        &self,
        mut run: DeploymentRun,
        context: WorkflowContext,
        cause: DeployError,
    ) -> DeployError {
        run.fail();
        self.stats.failed.fetch_add(1, Ordering::Relaxed);
        warn!(
            workflow_id = %run.workflow_id(),
            kind = %run.kind(),
            error = %cause,
            "[lo-05] Run aborted before submission"
        );
        if context.is_empty() {
            context.discard();
            return cause;
        }
        let report = self.compensation.compensate(context).await;
        DeployError::compensated(cause, report)
    }
}

#[async_trait]
impl DeploymentApi for DeploymentOrchestrator {
    async fn deploy(&self, request: DeployRequest) -> Result<DeploymentOutcome, DeployError> {
        let context = self.compensation.begin("deploy");
        let workflow_id = context.id();
        match self.deploy_in(request, context).await? {
            Progress::Completed { record, context } => {
                context.discard();
                Ok(DeploymentOutcome::Completed {
                    workflow_id,
                    record,
                })
            }
            Progress::AwaitingSignature {
                workflow_id,
                transaction,
            } => Ok(DeploymentOutcome::AwaitingSignature {
                workflow_id,
                transaction,
            }),
        }
    }

    #[instrument(
        skip(self, request, context),
        fields(workflow_id = %context.id(), artifact = %request.artifact, account = %request.account)
    )]
    async fn deploy_in(
        &self,
        request: DeployRequest,
        context: WorkflowContext,
    ) -> Result<Progress, DeployError> {
        self.stats.started.fetch_add(1, Ordering::Relaxed);
        let run = DeploymentRun::new(context.id(), DeploymentKind::Deploy);
        info!(type_name = %request.type_name, "[lo-05] Deployment started");

        let (call, component_type, salt) = match self.build_deploy(&request).await {
            Ok(built) => built,
            Err(err) => return Err(self.abort(run, context, err).await),
        };
        let flight = InFlight {
            run,
            context,
            account: request.account,
            salt,
            correlation: Correlation::Deploy { component_type },
            compensation: request.compensation,
        };
        self.submit(flight, call).await
    }

    #[instrument(
        skip(self, request),
        fields(artifact = %request.artifact, proxy = %request.proxy, account = %request.account)
    )]
    async fn upgrade(&self, request: UpgradeRequest) -> Result<DeploymentOutcome, DeployError> {
        self.stats.started.fetch_add(1, Ordering::Relaxed);
        let context = self.compensation.begin("upgrade");
        let workflow_id = context.id();
        let run = DeploymentRun::new(workflow_id, DeploymentKind::Upgrade);
        info!("[lo-05] Upgrade started");

        let (call, previous_logic, salt) = match self.build_upgrade(&request).await {
            Ok(built) => built,
            Err(err) => return Err(self.abort(run, context, err).await),
        };
        let flight = InFlight {
            run,
            context,
            account: request.account,
            salt,
            correlation: Correlation::Upgrade {
                proxy: request.proxy,
                previous_logic,
            },
            compensation: None,
        };
        match self.submit(flight, call).await? {
            Progress::Completed { record, context } => {
                context.discard();
                Ok(DeploymentOutcome::Completed {
                    workflow_id,
                    record,
                })
            }
            Progress::AwaitingSignature {
                workflow_id,
                transaction,
            } => Ok(DeploymentOutcome::AwaitingSignature {
                workflow_id,
                transaction,
            }),
        }
    }

    #[instrument(skip(self, payload), fields(payload_len = payload.len()))]
    async fn resume(&self, payload: &[u8]) -> Result<ResumeOutcome, DeployError> {
        // A rejected payload leaves the paused workflow in place.
        let (handle, submitted_at_block) = self.dispatcher.submit_signed(payload).await?;

        let Some(paused) = self.pending.take(handle.from, handle.nonce) else {
            debug!(
                tx_hash = %handle.hash,
                from = %handle.from,
                nonce = handle.nonce,
                "[lo-05] No paused workflow, confirming untracked transaction"
            );
            let receipt = self.dispatcher.confirm(handle, submitted_at_block).await?;
            return Ok(ResumeOutcome::Untracked(receipt));
        };

        let workflow_id = paused.workflow_id();
        self.stats.resumed.fetch_add(1, Ordering::Relaxed);
        info!(
            workflow_id = %workflow_id,
            tx_hash = %handle.hash,
            waited_ms = paused.paused_at.elapsed().as_millis() as u64,
            "[lo-05] Resuming workflow"
        );

        let confirmation = self.dispatcher.confirm(handle, submitted_at_block).await;
        let (record, context) = self.settle(paused.flight, confirmation).await?;
        context.discard();
        Ok(ResumeOutcome::Completed {
            workflow_id,
            record,
        })
    }

    async fn withdraw(&self, account: Address, nonce: u64) -> Option<WorkflowContext> {
        let mut paused = self.pending.take(account, nonce)?;
        paused.flight.run.fail();
        self.session.release_nonce(account, nonce).await;
        self.stats.failed.fetch_add(1, Ordering::Relaxed);
        warn!(
            workflow_id = %paused.workflow_id(),
            account = %account,
            nonce,
            steps = paused.flight.context.len(),
            "[lo-05] Paused workflow withdrawn"
        );
        Some(paused.flight.context)
    }

    async fn sweep_abandoned(&self, ttl: Duration) -> usize {
        let expired = self.pending.expire(ttl);
        let count = expired.len();
        for ((account, nonce), mut paused) in expired {
            paused.flight.run.fail();
            self.session.release_nonce(account, nonce).await;
            self.stats.expired.fetch_add(1, Ordering::Relaxed);
            warn!(
                workflow_id = %paused.workflow_id(),
                account = %account,
                nonce,
                "[lo-05] Abandoned workflow expired"
            );
            if !paused.flight.context.is_empty() {
                let report = self.compensation.compensate(paused.flight.context).await;
                if !report.all_succeeded() {
                    error!(report = %report, "[lo-05] Expired workflow left uncompensated steps");
                }
            }
        }
        count
    }
}

fn random_salt() -> Hash {
    Hash(rand::random::<[u8; 32]>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use lo_01_ledger_client::{InMemoryLedger, OfflineSigner, SessionConfig};
    use lo_02_type_registry::{type_id_for, RegistryEmulator, TypeRegistry};
    use lo_03_signer_dispatch::Dispatcher;
    use lo_04_compensation::{CompensationAction, CompensationError};
    use std::sync::Mutex;

    const ADMIN: Address = Address([0xAD; 20]);
    const REGISTRY: Address = Address([0x5E; 20]);
    const CODE: [u8; 4] = [0x60, 0x80, 0x60, 0x40];

    struct Harness {
        ledger: Arc<InMemoryLedger>,
        emulator: Arc<RegistryEmulator>,
        orchestrator: DeploymentOrchestrator,
    }

    async fn harness() -> Harness {
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
        let orchestrator = DeploymentOrchestrator::new(
            session,
            registry,
            dispatcher,
            Arc::new(CompensationManager::new()),
        );
        Harness {
            ledger,
            emulator,
            orchestrator,
        }
    }

    struct Undo {
        label: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl CompensationAction for Undo {
        fn describe(&self) -> String {
            format!("undo {}", self.label)
        }

        async fn compensate(&self) -> Result<(), CompensationError> {
            self.log.lock().unwrap().push(self.label);
            Ok(())
        }
    }

    fn undo(label: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<dyn CompensationAction> {
        Arc::new(Undo {
            label,
            log: Arc::clone(log),
        })
    }

    #[tokio::test]
    async fn test_delegated_deploy_registers() {
        let h = harness().await;
        let outcome = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap();

        let record = outcome.record().unwrap();
        assert!(!record.proxy.is_zero());
        assert_ne!(record.proxy, record.logic);
        assert_eq!(record.owner, ADMIN);
        assert_eq!(record.type_id, type_id_for("example"));
        assert_eq!(record.version.packed(), 0x0001);
        assert_eq!(h.orchestrator.stats().registered.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_same_code_twice_gets_distinct_addresses() {
        let h = harness().await;
        let first = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap();
        let second = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap();
        assert_ne!(first.record().unwrap().proxy, second.record().unwrap().proxy);
        assert_eq!(h.emulator.type_count(), 1);
    }

    #[tokio::test]
    async fn test_collapsed_addresses_violate_invariant() {
        let h = harness().await;
        h.emulator.set_collapse_addresses(true);

        let err = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeployInvariantViolation);
        assert!(matches!(err, DeployError::RolledBack { .. }));
    }

    #[tokio::test]
    async fn test_missing_event_is_unconfirmed_and_compensates() {
        let h = harness().await;
        h.orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut context = h.orchestrator.compensation().begin("suite");
        context.record(CommittedStep::new("earlier", ADMIN, undo("earlier", &log)));

        h.emulator.set_suppress_events(true);
        let err = h
            .orchestrator
            .deploy_in(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"), context)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DeployUnconfirmed);
        assert_eq!(err.compensation().unwrap().results.len(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["earlier"]);
    }

    struct Refuse;

    #[async_trait]
    impl CompensationAction for Refuse {
        fn describe(&self) -> String {
            "delete deployments/stuck".into()
        }

        async fn compensate(&self) -> Result<(), CompensationError> {
            Err(CompensationError::Failed("store refused delete".into()))
        }
    }

    #[tokio::test]
    async fn test_failed_inverse_surfaces_compensation_failed() {
        let h = harness().await;
        h.orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut context = h.orchestrator.compensation().begin("suite");
        context.record(CommittedStep::new("deployments/earlier", ADMIN, undo("earlier", &log)));
        context.record(CommittedStep::new("deployments/stuck", ADMIN, Arc::new(Refuse)));

        h.emulator.set_suppress_events(true);
        let err = h
            .orchestrator
            .deploy_in(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"), context)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CompensationFailed);
        assert!(matches!(err, DeployError::CompensationFailed { .. }));
        assert!(matches!(err.root_cause(), DeployError::DeployUnconfirmed { .. }));

        let report = err.compensation().unwrap();
        assert!(!report.all_succeeded());
        let failed: Vec<&str> = report.failures().map(|r| r.resource.as_str()).collect();
        assert_eq!(failed, vec!["deployments/stuck"]);
        assert_eq!(report.results.len(), 2);
        // Replay carries on past the failed inverse.
        assert_eq!(*log.lock().unwrap(), vec!["earlier"]);
    }

    #[tokio::test]
    async fn test_duplicate_events_are_ambiguous() {
        let h = harness().await;
        h.orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap();
        h.emulator.set_duplicate_events(true);

        let err = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.root_cause(),
            DeployError::DeployUnconfirmed { matches: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_timeout_recovered_by_event_query() {
        let h = harness().await;
        h.orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap();
        h.ledger.set_hide_receipts(true);

        let outcome = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap();
        assert!(outcome.record().is_some());
    }

    #[tokio::test]
    async fn test_timeout_without_event_surfaces_timeout() {
        let h = harness().await;
        h.orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap();
        h.ledger.set_hold_mining(true);

        let err = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LedgerTimeout);
        assert!(err.compensation().is_some());
    }

    #[tokio::test]
    async fn test_rejected_submission_has_no_compensation() {
        let h = harness().await;
        h.orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap();
        h.ledger.reject_next("insufficient funds");

        let err = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::LedgerRejected);
        assert!(err.compensation().is_none());
    }

    #[tokio::test]
    async fn test_signer_unavailable() {
        let h = harness().await;
        h.orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap();
        h.ledger.set_offline(true);

        let err = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap_err();
        assert!(err.compensation().is_none());
        assert!(matches!(
            err.kind(),
            ErrorKind::LedgerUnavailable | ErrorKind::SignerUnavailable
        ));
    }

    #[tokio::test]
    async fn test_compensation_recorded_after_registration() {
        let h = harness().await;
        let log = Arc::new(Mutex::new(Vec::new()));
        let context = h.orchestrator.compensation().begin("suite");

        let request = DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example")
            .with_compensation(undo("first", &log));
        let Progress::Completed { record, context } =
            h.orchestrator.deploy_in(request, context).await.unwrap()
        else {
            panic!("expected completion");
        };
        assert_eq!(context.len(), 1);
        assert_eq!(context.steps()[0].resource, record.proxy.to_string());

        h.emulator.set_suppress_events(true);
        let err = h
            .orchestrator
            .deploy_in(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"), context)
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::RolledBack { .. }));
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_external_deploy_pauses_and_resumes() {
        let h = harness().await;
        let signer = OfflineSigner::random();

        let outcome = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), signer.address(), "example"))
            .await
            .unwrap();
        let transaction = outcome.unsigned().unwrap().clone();
        assert_eq!(transaction.nonce, 0);
        assert_eq!(transaction.to, REGISTRY);
        assert_eq!(h.orchestrator.pending().len(), 1);

        let payload = signer.sign(&transaction).unwrap();
        let resumed = h.orchestrator.resume(&payload).await.unwrap();
        let ResumeOutcome::Completed { workflow_id, record } = resumed else {
            panic!("expected completion");
        };
        assert_eq!(workflow_id, outcome.workflow_id());
        assert_eq!(record.owner, signer.address());
        assert!(h.orchestrator.pending().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_payload_keeps_workflow_paused() {
        let h = harness().await;
        let signer = OfflineSigner::random();
        let outcome = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), signer.address(), "example"))
            .await
            .unwrap();
        let payload = signer.sign(outcome.unsigned().unwrap()).unwrap();

        h.ledger.reject_next("txpool full");
        assert!(h.orchestrator.resume(&payload).await.is_err());
        assert_eq!(h.orchestrator.pending().len(), 1);

        assert!(matches!(
            h.orchestrator.resume(&payload).await.unwrap(),
            ResumeOutcome::Completed { .. }
        ));
    }

    #[tokio::test]
    async fn test_untracked_payload_is_forwarded() {
        let h = harness().await;
        let signer = OfflineSigner::random();
        let call = ContractCall::new(Address([0x77; 20]), vec![0x01]);
        let tx = shared_types::UnsignedTransaction::assemble(
            signer.address(),
            &call,
            &shared_types::FeePolicy::default(),
            0,
        );
        let payload = signer.sign(&tx).unwrap();

        let outcome = h.orchestrator.resume(&payload).await.unwrap();
        assert!(matches!(outcome, ResumeOutcome::Untracked(receipt) if receipt.succeeded()));
    }

    #[tokio::test]
    async fn test_sweep_releases_nonce() {
        let h = harness().await;
        let signer = OfflineSigner::random();
        let first = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), signer.address(), "example"))
            .await
            .unwrap();
        assert_eq!(first.unsigned().unwrap().nonce, 0);

        assert_eq!(h.orchestrator.sweep_abandoned(Duration::ZERO).await, 1);
        assert!(h.orchestrator.pending().is_empty());

        let second = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), signer.address(), "example"))
            .await
            .unwrap();
        assert_eq!(second.unsigned().unwrap().nonce, 0);
    }

    #[tokio::test]
    async fn test_withdraw_hands_back_context_and_releases_nonce() {
        let h = harness().await;
        let signer = OfflineSigner::random();
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut context = h.orchestrator.compensation().begin("suite");
        context.record(CommittedStep::new("deployments/earlier", ADMIN, undo("earlier", &log)));

        let progress = h
            .orchestrator
            .deploy_in(
                DeployRequest::new("Example", CODE.to_vec(), signer.address(), "example"),
                context,
            )
            .await
            .unwrap();
        let Progress::AwaitingSignature { transaction, .. } = progress else {
            panic!("external account was not paused");
        };
        assert_eq!(h.orchestrator.pending().len(), 1);

        let context = h
            .orchestrator
            .withdraw(transaction.from, transaction.nonce)
            .await
            .unwrap();
        assert_eq!(context.len(), 1);
        assert!(h.orchestrator.pending().is_empty());
        assert!(h
            .orchestrator
            .withdraw(transaction.from, transaction.nonce)
            .await
            .is_none());

        let report = h.orchestrator.compensation().compensate(context).await;
        assert!(report.all_succeeded());
        assert_eq!(*log.lock().unwrap(), vec!["earlier"]);

        let again = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), signer.address(), "example"))
            .await
            .unwrap();
        assert_eq!(again.unsigned().unwrap().nonce, transaction.nonce);
    }

    #[tokio::test]
    async fn test_upgrade_replaces_logic() {
        let h = harness().await;
        let deployed = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap();
        let before = deployed.record().unwrap().clone();

        let upgraded = h
            .orchestrator
            .upgrade(UpgradeRequest::new("ExampleV2", before.proxy, vec![0x60, 0x81], ADMIN))
            .await
            .unwrap();
        let after = upgraded.record().unwrap();
        assert_eq!(after.proxy, before.proxy);
        assert_ne!(after.logic, before.logic);
        assert_ne!(after.logic, after.proxy);
    }

    #[tokio::test]
    async fn test_upgrade_by_non_owner_is_rejected_before_submission() {
        let h = harness().await;
        let deployed = h
            .orchestrator
            .deploy(DeployRequest::new("Example", CODE.to_vec(), ADMIN, "example"))
            .await
            .unwrap();
        let stranger = Address([0x99; 20]);

        let err = h
            .orchestrator
            .upgrade(UpgradeRequest::new(
                "ExampleV2",
                deployed.record().unwrap().proxy,
                vec![0x60, 0x81],
                stranger,
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert!(h.ledger.mined_from(stranger).is_empty());
    }
}
