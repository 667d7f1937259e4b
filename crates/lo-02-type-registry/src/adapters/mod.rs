//! # Adapters Layer
//!
//! In-memory registry contract for the in-memory ledger.

pub mod emulator;

pub use emulator::RegistryEmulator;
