//! # Adapters
//!
//! Implementations of the `LedgerClient` port.

pub mod json_rpc;
pub mod memory;
pub mod offline_signer;

pub use json_rpc::JsonRpcLedgerClient;
pub use memory::{CallEnv, ContractEmulator, EmittedLog, InMemoryLedger};
pub use offline_signer::{recover_envelope, signing_hash, OfflineSigner, SignedEnvelope};
