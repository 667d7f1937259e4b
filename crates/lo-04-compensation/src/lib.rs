//! # LO-04 Compensation Manager
//!
//! Tracks the reversible side effects of a multi-step workflow and, on
//! failure, issues best-effort inverse operations.
//!
//! **Component ID:** 04
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Contract
//!
//! - `WorkflowContext::record(step)` appends a step whose effect has been
//!   confirmed, together with the caller-supplied inverse.
//! - `CompensationManager::compensate(context)` replays the inverses last
//!   first. A failing inverse is logged and reported; the rest still run.
//!
//! Contexts live in memory for the duration of one request. A process
//! crash loses them.
//!
//! ## Module Structure
//!
//! ```text
//! lo-04-compensation/
//! ├── domain/     # WorkflowContext, CommittedStep, CompensationReport
//! ├── ports/      # CompensationAction, DocumentStore
//! ├── adapters/   # DeleteDocumentAction, LedgerCallAction, InMemoryDocumentStore
//! └── service.rs  # CompensationManager
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{DeleteDocumentAction, InMemoryDocumentStore, LedgerCallAction};
pub use domain::{
    CommittedStep, CompensationError, CompensationReport, CompensationResult, StoreError,
    WorkflowContext,
};
pub use ports::{CompensationAction, DocumentStore};
pub use service::{CompensationManager, CompensationStats};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
