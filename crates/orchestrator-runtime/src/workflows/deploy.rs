//! # Deployment Workflows
//!
//! Inbound entry points for deploying and upgrading components from build
//! artifacts, forwarding signed payloads, and deploying a suite of
//! components as one workflow.
//!
//! A suite saves each registered component under `deployments/<proxy>` in
//! the local store and records the deletion as its inverse, so a failure
//! further down the suite removes every record the suite wrote. A step
//! that pauses for a signature is withdrawn and unwound the same way.

use crate::artifacts::ArtifactStore;
use crate::workflows::{WorkflowError, WorkflowResponse};
use lo_02_type_registry::RegistryRecord;
use lo_03_signer_dispatch::{SignerDecision, SignerDispatchApi};
use lo_04_compensation::{
    CommittedStep, CompensationManager, DeleteDocumentAction, DocumentStore, WorkflowContext,
};
use lo_05_deployment::{DeployRequest, DeploymentApi, Progress, UpgradeRequest};
use serde_json::json;
use shared_types::{Address, Token};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Collection holding suite deployment records.
pub const DEPLOYMENTS: &str = "deployments";

/// Deploy one component from an artifact.
#[derive(Clone, Debug)]
pub struct DeployCommand {
    /// Artifact reference name.
    pub artifact: String,
    /// Component type; defaults to the artifact name.
    pub type_name: String,
    /// Owning account.
    pub account: Address,
    /// `initialize` arguments.
    pub init_args: Vec<Token>,
}

impl DeployCommand {
    /// Deploy `artifact` as its own type, without initializer arguments.
    pub fn new(artifact: impl Into<String>, account: Address) -> Self {
        let artifact = artifact.into();
        Self {
            type_name: artifact.clone(),
            artifact,
            account,
            init_args: Vec::new(),
        }
    }

    /// Register under another type name.
    #[must_use]
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Arguments for `initialize`.
    #[must_use]
    pub fn with_init_args(mut self, args: Vec<Token>) -> Self {
        self.init_args = args;
        self
    }
}

/// Deployment workflow entry points.
pub struct WorkflowApi {
    orchestrator: Arc<dyn DeploymentApi>,
    dispatcher: Arc<dyn SignerDispatchApi>,
    artifacts: Arc<ArtifactStore>,
    store: Arc<dyn DocumentStore>,
    compensation: Arc<CompensationManager>,
}

impl WorkflowApi {
    /// Wire the entry points.
    pub fn new(
        orchestrator: Arc<dyn DeploymentApi>,
        dispatcher: Arc<dyn SignerDispatchApi>,
        artifacts: Arc<ArtifactStore>,
        store: Arc<dyn DocumentStore>,
        compensation: Arc<CompensationManager>,
    ) -> Self {
        Self {
            orchestrator,
            dispatcher,
            artifacts,
            store,
            compensation,
        }
    }

    /// Deploy a component. External accounts get the transaction to sign.
    #[instrument(skip(self, command), fields(artifact = %command.artifact, account = %command.account))]
    pub async fn initiate_deploy(&self, command: DeployCommand) -> WorkflowResponse {
        let request = match self.request(&command).await {
            Ok(request) => request,
            Err(err) => return WorkflowResponse::failed(&err),
        };
        self.orchestrator.deploy(request).await.into()
    }

    /// Upgrade a proxy to the logic in `artifact`.
    #[instrument(skip(self))]
    pub async fn initiate_upgrade(
        &self,
        artifact: &str,
        proxy: Address,
        account: Address,
    ) -> WorkflowResponse {
        let artifact = match self.artifacts.load(artifact).await {
            Ok(artifact) => artifact,
            Err(err) => return WorkflowResponse::failed(&err.into()),
        };
        let request = UpgradeRequest::new(
            artifact.name.clone(),
            proxy,
            artifact.bytecode.clone(),
            account,
        );
        self.orchestrator.upgrade(request).await.into()
    }

    /// Forward an externally signed payload.
    #[instrument(skip(self, payload), fields(payload_len = payload.len()))]
    pub async fn submit_signed_payload(&self, payload: &[u8]) -> WorkflowResponse {
        self.orchestrator.resume(payload).await.into()
    }

    /// Deploy several components in order as one workflow.
    ///
    /// Every component is owned by `account`, which must be managed by the
    /// ledger node: a suite cannot pause halfway for signatures.
    #[instrument(skip(self, commands), fields(components = commands.len()))]
    pub async fn deploy_suite(&self, account: Address, commands: Vec<DeployCommand>) -> WorkflowResponse {
        let context = self.compensation.begin("deploy_suite");
        let workflow_id = context.id();
        match self.run_suite(account, commands, context).await {
            Ok(records) => {
                info!(workflow_id = %workflow_id, deployed = records.len(), "[runtime] Suite deployed");
                WorkflowResponse {
                    workflow_id: Some(workflow_id),
                    records,
                    ..WorkflowResponse::ok("suite deployed")
                }
            }
            Err(err) => {
                warn!(workflow_id = %workflow_id, error = %err, "[runtime] Suite failed");
                let mut response = WorkflowResponse::failed(&err);
                response.workflow_id = Some(workflow_id);
                response
            }
        }
    }

    async fn run_suite(
        &self,
        account: Address,
        commands: Vec<DeployCommand>,
        mut context: WorkflowContext,
    ) -> Result<Vec<RegistryRecord>, WorkflowError> {
        if commands.is_empty() {
            return Err(WorkflowError::InvalidRequest("empty suite".into()));
        }
        match self.dispatcher.classify(account).await? {
            SignerDecision::Delegated(_) => {}
            SignerDecision::External => return Err(WorkflowError::ExternalSigner(account)),
        }

        let mut records = Vec::with_capacity(commands.len());
        for command in commands {
            let command = DeployCommand { account, ..command };
            let request = match self.request(&command).await {
                Ok(request) => request,
                Err(err) => return Err(self.unwind(context, err).await),
            };

            match self.orchestrator.deploy_in(request, context).await? {
                Progress::Completed {
                    record,
                    context: next,
                } => {
                    context = self.save_record(&command, &record, next).await?;
                    records.push(record);
                }
                Progress::AwaitingSignature {
                    workflow_id,
                    transaction,
                } => {
                    warn!(workflow_id = %workflow_id, nonce = transaction.nonce, "[runtime] Suite step paused unexpectedly");
                    let err = WorkflowError::ExternalSigner(account);
                    return Err(
                        match self.orchestrator.withdraw(transaction.from, transaction.nonce).await {
                            Some(paused) => self.unwind(paused, err).await,
                            None => err,
                        },
                    );
                }
            }
        }

        context.discard();
        Ok(records)
    }

    async fn save_record(
        &self,
        command: &DeployCommand,
        record: &RegistryRecord,
        mut context: WorkflowContext,
    ) -> Result<WorkflowContext, WorkflowError> {
        let id = record.proxy.to_string();
        let document = json!({
            "artifact": command.artifact,
            "typeName": command.type_name,
            "workflowId": context.id(),
            "record": record,
        });
        if let Err(err) = self.store.save(DEPLOYMENTS, &id, document).await {
            return Err(self.unwind(context, err.into()).await);
        }
        context.record(CommittedStep::new(
            format!("{DEPLOYMENTS}/{id}"),
            record.owner,
            Arc::new(DeleteDocumentAction::new(Arc::clone(&self.store), DEPLOYMENTS, &id)),
        ));
        Ok(context)
    }

    async fn unwind(&self, context: WorkflowContext, err: WorkflowError) -> WorkflowError {
        if context.is_empty() {
            context.discard();
            return err;
        }
        let report = self.compensation.compensate(context).await;
        WorkflowError::compensated(err, report)
    }

    async fn request(&self, command: &DeployCommand) -> Result<DeployRequest, WorkflowError> {
        let artifact = self.artifacts.load(&command.artifact).await?;
        let init_data = artifact.encode_initializer(&command.init_args)?;
        Ok(DeployRequest::new(
            artifact.name.clone(),
            artifact.bytecode.clone(),
            command.account,
            command.type_name.clone(),
        )
        .with_init_data(init_data))
    }
}
