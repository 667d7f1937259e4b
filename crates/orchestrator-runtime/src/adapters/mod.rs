//! # Adapters
//!
//! Contract emulators for the in-memory ledger.

pub mod role_manager;

pub use role_manager::RoleManagerEmulator;
