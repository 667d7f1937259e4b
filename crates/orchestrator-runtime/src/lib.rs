//! # Ledger Orchestrator Runtime
//!
//! Wires the five components into one process and exposes the workflow
//! entry points.
//!
//! ## Components
//!
//! 1. Ledger Client (lo-01) - explicit session, nonces, confirmation
//! 2. Type Registry (lo-02) - component types and deployment records
//! 3. Signer Dispatch (lo-03) - delegated vs external signing
//! 4. Compensation (lo-04) - reverse replay of committed steps
//! 5. Deployment Orchestrator (lo-05) - deploy/upgrade state machine
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, then `LO_*` environment)
//! 2. Validate it
//! 3. Open the ledger session and unlock the admin reference account
//! 4. Initialize components in dependency order
//! 5. Spawn the pending-workflow sweeper
//!
//! ## Module Structure
//!
//! ```text
//! orchestrator-runtime/
//! ├── container/   # RuntimeConfig, ComponentContainer
//! ├── adapters/    # RoleManagerEmulator
//! ├── workflows/   # WorkflowApi, AdminWorkflows, WorkflowResponse
//! ├── artifacts.rs # ArtifactStore
//! └── runtime.rs   # Runtime (start, sweeper, shutdown)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod artifacts;
pub mod container;
pub mod runtime;
pub mod workflows;

// Re-exports
pub use adapters::RoleManagerEmulator;
pub use artifacts::{Artifact, ArtifactError, ArtifactStore};
pub use container::{ComponentContainer, ConfigError, RuntimeConfig, StartupError};
pub use runtime::Runtime;
pub use workflows::{
    AdminRecord, AdminWorkflows, DeployCommand, WorkflowApi, WorkflowError, WorkflowResponse,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
