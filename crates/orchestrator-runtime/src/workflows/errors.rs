//! Workflow errors.

use crate::artifacts::ArtifactError;
use lo_01_ledger_client::LedgerError;
use lo_03_signer_dispatch::DispatchError;
use lo_04_compensation::{CompensationReport, StoreError};
use lo_05_deployment::{DeployError, ErrorKind};
use shared_types::{AbiError, Address, Hash};
use thiserror::Error;

/// Failures of the runtime workflows.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Deployment or upgrade failed.
    #[error(transparent)]
    Deploy(#[from] DeployError),

    /// Artifact could not be used.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Local store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Role manager call failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Event lookup failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Sender holds no admin record.
    #[error("{0} is not an admin")]
    NotAdmin(Address),

    /// Username or account already taken.
    #[error("admin '{0}' already exists")]
    AlreadyAdmin(String),

    /// No admin with that username.
    #[error("no admin named '{0}'")]
    UnknownAdmin(String),

    /// An admin tried to remove itself.
    #[error("an admin cannot remove itself")]
    SelfRemoval,

    /// The workflow needs server-side signing.
    #[error("account {0} is not managed by the ledger node")]
    ExternalSigner(Address),

    /// Role manager is not configured.
    #[error("role manager address is not configured")]
    RolesDisabled,

    /// Confirmed transaction without its event.
    #[error("{event} not found for transaction {tx_hash} in block {block_number}")]
    EventMissing {
        /// Expected event
        event: &'static str,
        /// Confirmed transaction
        tx_hash: Hash,
        /// Including block
        block_number: u64,
    },

    /// Request could not be satisfied as given.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Failure after a committed step, every compensation succeeded.
    #[error("{cause}; rolled back ({report})")]
    RolledBack {
        /// Original failure
        cause: Box<WorkflowError>,
        /// Compensation summary
        report: CompensationReport,
    },

    /// Failure after a committed step, at least one compensation failed.
    #[error("{cause}; compensation incomplete ({report})")]
    CompensationFailed {
        /// Original failure
        cause: Box<WorkflowError>,
        /// Compensation summary
        report: CompensationReport,
    },
}

impl WorkflowError {
    /// Wrap a failure with its compensation report.
    pub fn compensated(cause: WorkflowError, report: CompensationReport) -> Self {
        let cause = Box::new(cause);
        if report.all_succeeded() {
            Self::RolledBack { cause, report }
        } else {
            Self::CompensationFailed { cause, report }
        }
    }

    /// Taxonomy entry.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Deploy(err) => err.kind(),
            Self::Dispatch(err) => DeployError::from(err.clone()).kind(),
            Self::Ledger(err) => DeployError::from(err.clone()).kind(),
            Self::Store(_) => ErrorKind::Internal,
            Self::Artifact(_)
            | Self::NotAdmin(_)
            | Self::AlreadyAdmin(_)
            | Self::UnknownAdmin(_)
            | Self::SelfRemoval
            | Self::RolesDisabled
            | Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::ExternalSigner(_) => ErrorKind::SignerUnavailable,
            Self::EventMissing { .. } => ErrorKind::DeployUnconfirmed,
            Self::RolledBack { cause, .. } => cause.kind(),
            Self::CompensationFailed { .. } => ErrorKind::CompensationFailed,
        }
    }

    /// Compensation summary, when compensation ran.
    pub fn compensation(&self) -> Option<&CompensationReport> {
        match self {
            Self::RolledBack { report, .. } | Self::CompensationFailed { report, .. } => {
                Some(report)
            }
            Self::Deploy(err) => err.compensation(),
            _ => None,
        }
    }
}

impl From<AbiError> for WorkflowError {
    fn from(err: AbiError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}
