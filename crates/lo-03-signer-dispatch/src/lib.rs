//! # LO-03 Dual-Signer Dispatcher
//!
//! Decides per call whether the server can sign for an account, then either
//! submits the call or hands back an unsigned, fee-populated transaction.
//!
//! **Component ID:** 03
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Signer Decision
//!
//! An account is `Delegated` when it appears in the ledger's managed-account
//! listing and `External` otherwise. The decision is made once per call and
//! passed along with it (`dispatch_with`).
//!
//! ## Nonces
//!
//! Nonce allocation goes through the session's per-account sequence point
//! on both paths. The first external call for an account gets the ledger's
//! pending count; concurrent ones get the following reserved nonces.
//!
//! ## Module Structure
//!
//! ```text
//! lo-03-signer-dispatch/
//! ├── domain/     # SignerDecision, DispatchOutcome, DispatchError
//! ├── ports/      # SignerDispatchApi
//! └── service.rs  # Dispatcher
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use domain::{DispatchError, DispatchOutcome, SignerDecision};
pub use ports::SignerDispatchApi;
pub use service::{DispatchStats, Dispatcher};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
