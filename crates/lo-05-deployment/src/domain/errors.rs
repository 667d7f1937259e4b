//! # Domain Errors
//!
//! Error types for the Deployment Orchestrator.
//!
//! Failures before submission carry no report. Failures after a
//! transaction reached the ledger are wrapped as `RolledBack` or
//! `CompensationFailed` together with what compensation did.

use crate::domain::DeploymentState;
use lo_01_ledger_client::LedgerError;
use lo_02_type_registry::RegistryError;
use lo_03_signer_dispatch::DispatchError;
use lo_04_compensation::CompensationReport;
use serde::Serialize;
use shared_types::{AbiError, Address, Hash};
use std::fmt;
use thiserror::Error;

/// Caller-facing failure taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// The ledger refused or reverted a transaction.
    LedgerRejected,
    /// No confirmation within the bounded wait.
    LedgerTimeout,
    /// The ledger endpoint could not be reached.
    LedgerUnavailable,
    /// Type re-registered with a divergent version.
    TypeConflict,
    /// Type does not exist.
    TypeNotFound,
    /// Malformed or non-increasing version.
    InvalidVersion,
    /// Zero or several matching registry events.
    DeployUnconfirmed,
    /// Proxy and logic addresses collapsed.
    DeployInvariantViolation,
    /// Custody of the signing account could not be determined.
    SignerUnavailable,
    /// At least one compensation failed.
    CompensationFailed,
    /// Malformed request.
    InvalidRequest,
    /// Orchestrator bug.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Deployment errors.
#[derive(Debug, Clone, Error)]
pub enum DeployError {
    /// Custody lookup failed.
    #[error("signer unavailable: {0}")]
    SignerUnavailable(#[source] LedgerError),

    /// Ledger failure outside confirmation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Included with a failed status.
    #[error("transaction {tx_hash} reverted in block {block_number}")]
    Reverted {
        /// Reverted transaction
        tx_hash: Hash,
        /// Including block
        block_number: u64,
    },

    /// Type registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Event correlation found no unique match.
    #[error("{event} not confirmed: {matches} matching events in blocks {from_block}..={to_block}")]
    DeployUnconfirmed {
        /// Event queried
        event: &'static str,
        /// Matches found
        matches: usize,
        /// First block searched
        from_block: u64,
        /// Last block searched
        to_block: u64,
    },

    /// Addresses that must differ did not.
    #[error("deployment invariant violated: {detail} (proxy {proxy}, logic {logic})")]
    DeployInvariantViolation {
        /// Proxy address
        proxy: Address,
        /// Logic address
        logic: Address,
        /// Which pair collapsed
        detail: &'static str,
    },

    /// Request could not be encoded or is inconsistent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Illegal state machine move.
    #[error("invalid transition {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: DeploymentState,
        /// Requested state
        to: DeploymentState,
    },

    /// Post-submission failure, every compensation succeeded.
    #[error("{cause}; rolled back ({report})")]
    RolledBack {
        /// Original failure
        cause: Box<DeployError>,
        /// Compensation summary
        report: CompensationReport,
    },

    /// Post-submission failure, at least one compensation failed.
    #[error("{cause}; compensation incomplete ({report})")]
    CompensationFailed {
        /// Original failure
        cause: Box<DeployError>,
        /// Compensation summary
        report: CompensationReport,
    },
}

impl DeployError {
    /// Wrap a post-submission failure with its compensation report.
    pub fn compensated(cause: DeployError, report: CompensationReport) -> Self {
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
            Self::SignerUnavailable(_) => ErrorKind::SignerUnavailable,
            Self::Ledger(err) => ledger_kind(err),
            Self::Reverted { .. } => ErrorKind::LedgerRejected,
            Self::Registry(err) => registry_kind(err),
            Self::DeployUnconfirmed { .. } => ErrorKind::DeployUnconfirmed,
            Self::DeployInvariantViolation { .. } => ErrorKind::DeployInvariantViolation,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::InvalidTransition { .. } => ErrorKind::Internal,
            Self::RolledBack { cause, .. } => cause.kind(),
            Self::CompensationFailed { .. } => ErrorKind::CompensationFailed,
        }
    }

    /// The failure that started it all.
    pub fn root_cause(&self) -> &DeployError {
        match self {
            Self::RolledBack { cause, .. } | Self::CompensationFailed { cause, .. } => {
                cause.root_cause()
            }
            other => other,
        }
    }

    /// Compensation summary, when compensation ran.
    pub fn compensation(&self) -> Option<&CompensationReport> {
        match self {
            Self::RolledBack { report, .. } | Self::CompensationFailed { report, .. } => {
                Some(report)
            }
            _ => None,
        }
    }
}

impl From<DispatchError> for DeployError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::SignerUnavailable(source) => Self::SignerUnavailable(source),
            DispatchError::Submission(source) | DispatchError::View(source) => {
                Self::Ledger(source)
            }
            DispatchError::Confirmation { source, .. } => Self::Ledger(source),
            DispatchError::Reverted { receipt } => Self::Reverted {
                tx_hash: receipt.transaction_hash,
                block_number: receipt.block_number,
            },
        }
    }
}

impl From<AbiError> for DeployError {
    fn from(err: AbiError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}

fn ledger_kind(err: &LedgerError) -> ErrorKind {
    match err {
        LedgerError::Rejected(_) => ErrorKind::LedgerRejected,
        LedgerError::Timeout { .. } => ErrorKind::LedgerTimeout,
        LedgerError::Unavailable(_) | LedgerError::SessionClosed => ErrorKind::LedgerUnavailable,
        LedgerError::Rpc { .. } => ErrorKind::LedgerRejected,
        LedgerError::Decode(_) | LedgerError::Abi(_) => ErrorKind::Internal,
    }
}

fn registry_kind(err: &RegistryError) -> ErrorKind {
    match err {
        RegistryError::TypeConflict { .. } => ErrorKind::TypeConflict,
        RegistryError::TypeNotFound(_) => ErrorKind::TypeNotFound,
        RegistryError::InvalidVersion(_) | RegistryError::VersionNotNewer { .. } => {
            ErrorKind::InvalidVersion
        }
        RegistryError::InvalidTypeId(_)
        | RegistryError::RecordNotFound(_)
        | RegistryError::BatchShape { .. } => ErrorKind::InvalidRequest,
        RegistryError::Reverted { .. } => ErrorKind::LedgerRejected,
        RegistryError::EventMissing { .. } => ErrorKind::DeployUnconfirmed,
        RegistryError::Ledger(err) => ledger_kind(err),
        RegistryError::Abi(_) => ErrorKind::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lo_02_type_registry::Version;
    use lo_04_compensation::CompensationResult;
    use std::time::Duration;
    use uuid::Uuid;

    fn unconfirmed() -> DeployError {
        DeployError::DeployUnconfirmed {
            event: "Deployed",
            matches: 0,
            from_block: 3,
            to_block: 3,
        }
    }

    fn report(succeeded: bool) -> CompensationReport {
        CompensationReport {
            workflow_id: Uuid::new_v4(),
            results: vec![CompensationResult {
                resource: "deployments/0x01".into(),
                action: "delete deployments/0x01".into(),
                succeeded,
                error: (!succeeded).then(|| "store offline".to_string()),
            }],
        }
    }

    #[test]
    fn test_rolled_back_keeps_cause_kind() {
        let err = DeployError::compensated(unconfirmed(), report(true));
        assert!(matches!(err, DeployError::RolledBack { .. }));
        assert_eq!(err.kind(), ErrorKind::DeployUnconfirmed);
        assert!(matches!(err.root_cause(), DeployError::DeployUnconfirmed { .. }));
        assert_eq!(err.compensation().map(|r| r.results.len()), Some(1));
    }

    #[test]
    fn test_partial_compensation() {
        let err = DeployError::compensated(unconfirmed(), report(false));
        assert_eq!(err.kind(), ErrorKind::CompensationFailed);
        assert!(err.to_string().contains("store offline"));
        assert!(matches!(err.root_cause(), DeployError::DeployUnconfirmed { .. }));
    }

    #[test]
    fn test_dispatch_mapping() {
        let timeout = LedgerError::Timeout {
            tx_hash: Hash::ZERO,
            waited: Duration::from_secs(1),
        };
        assert_eq!(
            DeployError::from(DispatchError::Submission(LedgerError::Rejected("nonce".into()))).kind(),
            ErrorKind::LedgerRejected
        );
        assert_eq!(
            DeployError::from(DispatchError::SignerUnavailable(LedgerError::Unavailable("down".into()))).kind(),
            ErrorKind::SignerUnavailable
        );
        assert_eq!(DeployError::Ledger(timeout).kind(), ErrorKind::LedgerTimeout);
    }

    #[test]
    fn test_registry_mapping() {
        let conflict = RegistryError::TypeConflict {
            name: "example".into(),
            registered: Version::new(0, 1).unwrap(),
            requested: Version::new(0, 2).unwrap(),
        };
        assert_eq!(DeployError::from(conflict).kind(), ErrorKind::TypeConflict);
        assert_eq!(
            DeployError::from(RegistryError::InvalidVersion("1".into())).kind(),
            ErrorKind::InvalidVersion
        );
    }
}
