//! Workflow responses.
//!
//! Every entry point answers with a [`WorkflowResponse`], never a bare
//! error: failures carry their taxonomy entry and, when compensation ran,
//! its report.

use crate::workflows::{AdminRecord, WorkflowError};
use lo_02_type_registry::RegistryRecord;
use lo_04_compensation::CompensationReport;
use lo_05_deployment::{DeploymentOutcome, ErrorKind, ResumeOutcome};
use serde::Serialize;
use shared_types::{Receipt, UnsignedTransaction};
use uuid::Uuid;

/// Transport-neutral workflow result.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowResponse {
    /// Whether the workflow reached its goal (or paused for a signature).
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Failure category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Workflow id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<Uuid>,
    /// Registry record of a deployed or upgraded component.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RegistryRecord>,
    /// Records of a multi-deploy, in order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<RegistryRecord>,
    /// Transaction the caller must sign.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsigned_transaction: Option<UnsignedTransaction>,
    /// Receipt of a forwarded transaction no workflow was waiting on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<Receipt>,
    /// Admin record written or removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminRecord>,
    /// What compensation did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensation: Option<CompensationReport>,
}

impl WorkflowResponse {
    /// Successful response.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ..Self::default()
        }
    }

    /// Failed response.
    pub fn failed(err: &WorkflowError) -> Self {
        let compensation = err.compensation().cloned();
        Self {
            success: false,
            message: err.to_string(),
            error_kind: Some(err.kind()),
            workflow_id: compensation.as_ref().map(|report| report.workflow_id),
            compensation,
            ..Self::default()
        }
    }

    /// Response for a started deployment or upgrade.
    pub fn from_outcome(outcome: DeploymentOutcome) -> Self {
        match outcome {
            DeploymentOutcome::Completed {
                workflow_id,
                record,
            } => Self {
                workflow_id: Some(workflow_id),
                record: Some(record),
                ..Self::ok("component registered")
            },
            DeploymentOutcome::AwaitingSignature {
                workflow_id,
                transaction,
            } => Self {
                workflow_id: Some(workflow_id),
                unsigned_transaction: Some(transaction),
                ..Self::ok("sign the transaction and submit the signed payload")
            },
        }
    }

    /// Response for a forwarded signed payload.
    pub fn from_resume(outcome: ResumeOutcome) -> Self {
        match outcome {
            ResumeOutcome::Completed {
                workflow_id,
                record,
            } => Self {
                workflow_id: Some(workflow_id),
                record: Some(record),
                ..Self::ok("component registered")
            },
            ResumeOutcome::Untracked(receipt) => Self {
                receipt: Some(receipt),
                ..Self::ok("transaction confirmed")
            },
        }
    }

    /// Whether the caller still has to sign.
    pub fn awaiting_signature(&self) -> bool {
        self.unsigned_transaction.is_some()
    }
}

impl<T: Into<WorkflowResponse>, E: Into<WorkflowError>> From<Result<T, E>> for WorkflowResponse {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => value.into(),
            Err(err) => Self::failed(&err.into()),
        }
    }
}

impl From<DeploymentOutcome> for WorkflowResponse {
    fn from(outcome: DeploymentOutcome) -> Self {
        Self::from_outcome(outcome)
    }
}

impl From<ResumeOutcome> for WorkflowResponse {
    fn from(outcome: ResumeOutcome) -> Self {
        Self::from_resume(outcome)
    }
}
