//! # LO-01 Ledger Client
//!
//! Sole point of contact with the external distributed ledger.
//!
//! **Component ID:** 01  
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Purpose
//!
//! - List the accounts whose keys the ledger node custodies
//! - Submit node-signed and externally signed transactions
//! - Wait, with a bounded timeout, for inclusion
//! - Query contract events over a block range with positional filters
//!
//! The client never retries. A confirmation timeout does not mean the
//! transaction failed; callers re-check by event correlation.
//!
//! ## Ledger Session
//!
//! [`LedgerSession`] is constructed once at startup and passed to every
//! component. It owns the client handle, the session configuration and the
//! per-account [`NonceAllocator`], and is shut down explicitly.
//!
//! ## Module Structure
//!
//! ```text
//! lo-01-ledger-client/
//! ├── domain/     # LedgerError, NonceAllocator
//! ├── ports/      # LedgerClient
//! ├── adapters/   # JsonRpcLedgerClient, InMemoryLedger, OfflineSigner
//! └── service.rs  # LedgerSession
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{
    CallEnv, ContractEmulator, EmittedLog, InMemoryLedger, JsonRpcLedgerClient, OfflineSigner,
};
pub use domain::{LedgerError, NonceAllocator, NonceLease, SigningError};
pub use ports::LedgerClient;
pub use service::{LedgerSession, SessionConfig, SessionStats};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
