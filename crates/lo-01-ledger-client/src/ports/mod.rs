//! # Ports Module
//!
//! The ledger connectivity port consumed by every other component.

pub mod outbound;

pub use outbound::*;
