//! # LO-05 Deployment Orchestrator
//!
//! Drives registry-mediated deployments and upgrades through an explicit
//! state machine and refuses to report success without a uniquely
//! correlated registry event.
//!
//! **Component ID:** 05
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## State Machine
//!
//! `Building → Submitting → AwaitingConfirmation → Verifying → Registered`,
//! or `Failed` from any non-terminal state.
//!
//! ## Guarantees
//!
//! - Every run uses a fresh random salt, so racing deployments of the same
//!   code never collide.
//! - A run is `Registered` only when exactly one `Deployed`/`Upgraded`
//!   event matches `(owner, type, salt)` and its addresses are distinct.
//! - A confirmation timeout is not a failure until event correlation over
//!   `[submission block, head]` also comes up empty.
//! - Failures after submission always go through the Compensation Manager.
//! - External-signature runs park under `(account, nonce)` until the signed
//!   payload arrives; abandoned ones expire silently and release their nonce.
//!
//! ## Module Structure
//!
//! ```text
//! lo-05-deployment/
//! ├── domain/     # DeploymentRun, PendingWorkflows, DeployError, ErrorKind
//! ├── ports/      # DeploymentApi
//! └── service.rs  # DeploymentOrchestrator
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use domain::{
    Correlation, DeployError, DeployRequest, DeploymentKind, DeploymentOutcome, DeploymentRun,
    DeploymentState, ErrorKind, InFlight, PendingWorkflow, PendingWorkflows, Progress,
    ResumeOutcome, UpgradeRequest,
};
pub use ports::DeploymentApi;
pub use service::{DeploymentOrchestrator, OrchestratorStats};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
