//! # Inbound Ports
//!
//! API exposed by the Deployment Orchestrator.

use crate::domain::{
    DeployError, DeployRequest, DeploymentOutcome, Progress, ResumeOutcome, UpgradeRequest,
};
use async_trait::async_trait;
use lo_04_compensation::WorkflowContext;
use shared_types::Address;
use std::time::Duration;

/// Deployment Orchestrator API - inbound port.
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Deploy a component in its own workflow.
    async fn deploy(&self, request: DeployRequest) -> Result<DeploymentOutcome, DeployError>;

    /// Deploy as one step of a larger workflow.
    ///
    /// Any failure compensates everything already recorded in `context`.
    async fn deploy_in(
        &self,
        request: DeployRequest,
        context: WorkflowContext,
    ) -> Result<Progress, DeployError>;

    /// Upgrade a proxy's logic in its own workflow.
    async fn upgrade(&self, request: UpgradeRequest) -> Result<DeploymentOutcome, DeployError>;

    /// Forward a signed payload and continue the workflow waiting on it.
    async fn resume(&self, payload: &[u8]) -> Result<ResumeOutcome, DeployError>;

    /// Take back the workflow paused on `(account, nonce)` without a payload.
    ///
    /// The nonce is released and the workflow's context is handed back
    /// for the caller to compensate. `None` when nothing waits there.
    async fn withdraw(&self, account: Address, nonce: u64) -> Option<WorkflowContext>;

    /// Drop workflows paused for at least `ttl`. Returns how many expired.
    async fn sweep_abandoned(&self, ttl: Duration) -> usize;
}
