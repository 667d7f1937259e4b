//! # Domain Layer
//!
//! Workflow contexts, committed steps and compensation reports.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
