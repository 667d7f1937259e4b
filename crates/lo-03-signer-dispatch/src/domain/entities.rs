//! # Domain Entities

use shared_types::{Address, Receipt, UnsignedTransaction};

/// Who signs a call for an account.
///
/// Computed once per call from the ledger's managed-account listing and
/// threaded through the workflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignerDecision {
    /// The ledger node custodies the key; the server signs.
    Delegated(Address),
    /// A third party holds the key; the server only prepares.
    External,
}

impl SignerDecision {
    /// Whether the server can sign.
    pub fn is_delegated(&self) -> bool {
        matches!(self, Self::Delegated(_))
    }
}

/// Result of dispatching a state-changing call.
#[derive(Clone, Debug)]
pub enum DispatchOutcome {
    /// Signed, submitted and included (delegated path).
    Submitted(Receipt),
    /// Fee-populated and returned for out-of-band signing (external path).
    PendingSignature(UnsignedTransaction),
}

impl DispatchOutcome {
    /// Receipt, when the call was submitted.
    pub fn receipt(&self) -> Option<&Receipt> {
        match self {
            Self::Submitted(receipt) => Some(receipt),
            Self::PendingSignature(_) => None,
        }
    }

    /// Unsigned transaction, when the caller must sign.
    pub fn unsigned(&self) -> Option<&UnsignedTransaction> {
        match self {
            Self::PendingSignature(tx) => Some(tx),
            Self::Submitted(_) => None,
        }
    }
}
