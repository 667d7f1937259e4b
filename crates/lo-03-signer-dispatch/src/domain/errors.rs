//! # Domain Errors
//!
//! Error types for the Dual-Signer Dispatcher.

use lo_01_ledger_client::LedgerError;
use shared_types::{Receipt, TransactionHandle};
use thiserror::Error;

/// Dispatch errors.
///
/// `SignerUnavailable` and `Submission` mean nothing reached the ledger.
/// `Confirmation` and `Reverted` mean a transaction was accepted.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// Custody could not be determined.
    #[error("signer unavailable: {0}")]
    SignerUnavailable(#[source] LedgerError),

    /// The ledger refused the transaction, or its nonce could not be read.
    #[error("submission failed: {0}")]
    Submission(#[source] LedgerError),

    /// Accepted but not confirmed.
    #[error("transaction {} not confirmed: {source}", .handle.hash)]
    Confirmation {
        /// Submitted transaction
        handle: TransactionHandle,
        /// Head block just before submission
        submitted_at_block: u64,
        /// Why confirmation failed
        source: LedgerError,
    },

    /// Included with a failed status.
    #[error("transaction {} reverted in block {}", .receipt.transaction_hash, .receipt.block_number)]
    Reverted {
        /// Receipt of the reverted transaction
        receipt: Box<Receipt>,
    },

    /// A read-only call failed.
    #[error("view call failed: {0}")]
    View(#[source] LedgerError),
}

impl DispatchError {
    /// Whether a transaction reached the ledger.
    pub fn was_submitted(&self) -> bool {
        matches!(self, Self::Confirmation { .. } | Self::Reverted { .. })
    }

    /// The underlying ledger error, if any.
    pub fn ledger_error(&self) -> Option<&LedgerError> {
        match self {
            Self::SignerUnavailable(e) | Self::Submission(e) | Self::View(e) => Some(e),
            Self::Confirmation { source, .. } => Some(source),
            Self::Reverted { .. } => None,
        }
    }
}
