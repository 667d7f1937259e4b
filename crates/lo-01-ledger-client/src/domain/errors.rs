//! # Domain Errors
//!
//! Error types for the Ledger Client.

use shared_types::{AbiError, Hash};
use std::time::Duration;
use thiserror::Error;

/// Ledger interaction errors.
///
/// The client never retries; every variant is surfaced to the caller.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// The ledger refused a transaction (malformed, under-funded, bad nonce,
    /// locked account).
    #[error("ledger rejected transaction: {0}")]
    Rejected(String),

    /// No receipt within the bounded wait. The transaction may still land.
    #[error("no confirmation for {tx_hash} after {waited:?}")]
    Timeout {
        /// Transaction being awaited
        tx_hash: Hash,
        /// How long the caller waited
        waited: Duration,
    },

    /// The ledger endpoint could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// The ledger answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message
        message: String,
    },

    /// The ledger answered with something that could not be decoded.
    #[error("malformed ledger response: {0}")]
    Decode(String),

    /// A log could not be decoded against its event descriptor.
    #[error("abi error: {0}")]
    Abi(#[from] AbiError),

    /// The session was shut down.
    #[error("ledger session closed")]
    SessionClosed,
}

impl LedgerError {
    /// Whether the endpoint itself could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::SessionClosed)
    }
}

/// Offline signing and payload recovery errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// Payload is not a signed envelope.
    #[error("malformed signed payload: {0}")]
    Malformed(String),

    /// Signature bytes do not form a recoverable signature.
    #[error("invalid signature")]
    InvalidSignature,

    /// Recovered signer differs from the declared sender.
    #[error("signature from {recovered} does not match sender {claimed}")]
    SenderMismatch {
        /// Sender declared in the transaction
        claimed: shared_types::Address,
        /// Sender recovered from the signature
        recovered: shared_types::Address,
    },
}

impl From<SigningError> for LedgerError {
    fn from(err: SigningError) -> Self {
        LedgerError::Rejected(err.to_string())
    }
}
