//! # Ports Layer
//!
//! The registry API consumed by the Deployment Orchestrator.

pub mod inbound;

pub use inbound::*;
