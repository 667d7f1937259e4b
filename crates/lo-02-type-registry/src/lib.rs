//! # LO-02 Type Registry
//!
//! On-chain catalogue of component types and deployment records.
//!
//! **Component ID:** 02
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Purpose
//!
//! - Map a human-readable type name to a stable identifier (`keccak256(name)`)
//!   and a current `major.minor` version
//! - Register new types, idempotently for an identical version
//! - Bump a type's version explicitly
//! - Read the registry record of a deployed component
//!
//! ## Version Packing
//!
//! Versions travel as `bytes2`, one byte per half:
//!
//! ```text
//! "0.1"   ──► 0x0001
//! "01.10" ──► 0x010A
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! lo-02-type-registry/
//! ├── domain/
//! │   ├── contract.rs       # Registry capability table and events
//! │   ├── entities.rs       # ComponentType, RegistryRecord, Registration
//! │   ├── value_objects.rs  # Version, TypeRef
//! │   └── errors.rs         # RegistryError
//! ├── ports/
//! │   └── inbound.rs        # TypeRegistryApi
//! ├── adapters/
//! │   └── emulator.rs       # RegistryEmulator (in-memory ledger)
//! └── service.rs            # TypeRegistry
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::RegistryEmulator;
pub use domain::contract::{DEPLOYED, DEPLOY_CONTRACT, UPGRADED, UPGRADE_CONTRACT};
pub use domain::{
    type_id_for, ComponentType, Registration, RegistryError, RegistryRecord, TypeRef, Version,
    DEFAULT_VERSION, REGISTRY_ABI,
};
pub use ports::TypeRegistryApi;
pub use service::TypeRegistry;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
