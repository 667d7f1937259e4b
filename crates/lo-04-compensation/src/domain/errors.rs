//! # Domain Errors
//!
//! Error types for compensation and the local document store.

use lo_03_signer_dispatch::DispatchError;
use shared_types::Address;
use thiserror::Error;

/// Why a compensating action failed.
#[derive(Debug, Clone, Error)]
pub enum CompensationError {
    /// The inverse ledger call failed.
    #[error("inverse call failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// The inverse call needs a signature the server does not hold.
    #[error("account {0} is externally signed; inverse call must be signed by its keyholder")]
    ExternalSigner(Address),

    /// The local store could not be updated.
    #[error("store: {0}")]
    Store(#[from] StoreError),

    /// The action declined to run.
    #[error("{0}")]
    Failed(String),
}

/// Local document store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// A document could not be (de)serialized.
    #[error("document serialization: {0}")]
    Serialization(String),
}
