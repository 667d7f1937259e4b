//! # Domain Module
//!
//! Errors and nonce sequencing for the Ledger Client.

pub mod errors;
pub mod nonce;

pub use errors::*;
pub use nonce::{NonceAllocator, NonceLease};
