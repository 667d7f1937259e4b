//! # Domain Errors
//!
//! Error types for the Type Registry.

use super::value_objects::Version;
use lo_01_ledger_client::LedgerError;
use shared_types::{AbiError, Address, Hash};
use thiserror::Error;

/// Type Registry errors.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// The name is registered with a different version.
    #[error("type '{name}' already registered at {registered}, requested {requested}")]
    TypeConflict {
        /// Type name
        name: String,
        /// Version on the ledger
        registered: Version,
        /// Version the caller asked for
        requested: Version,
    },

    /// No type with this name or identifier.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// Version text is not `MM.mm`.
    #[error("invalid version '{0}', expected MM.mm")]
    InvalidVersion(String),

    /// Identifier text is not a 32-byte hex value.
    #[error("invalid type id '{0}'")]
    InvalidTypeId(String),

    /// A version update would move backwards or stand still.
    #[error("version {requested} does not replace current {current}")]
    VersionNotNewer {
        /// Version on the ledger
        current: Version,
        /// Version the caller asked for
        requested: Version,
    },

    /// No registry record for this proxy.
    #[error("no registry record for {0}")]
    RecordNotFound(Address),

    /// Batch registration with a version list that fits no names.
    #[error("{versions} versions given for {names} types")]
    BatchShape {
        /// Number of names
        names: usize,
        /// Number of versions
        versions: usize,
    },

    /// The registry transaction was included but reverted.
    #[error("registry {operation} reverted in {tx_hash}")]
    Reverted {
        /// Registry operation
        operation: &'static str,
        /// Transaction hash
        tx_hash: Hash,
    },

    /// The expected registry event was not found for a confirmed transaction.
    #[error("registry {operation} confirmed in {tx_hash} without its {event} event")]
    EventMissing {
        /// Registry operation
        operation: &'static str,
        /// Expected event
        event: &'static str,
        /// Transaction hash
        tx_hash: Hash,
    },

    /// Ledger interaction failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Registry data could not be encoded or decoded.
    #[error("registry abi error: {0}")]
    Abi(#[from] AbiError),
}
