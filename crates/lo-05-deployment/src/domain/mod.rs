//! # Domain Layer
//!
//! State machine, requests, paused workflows and errors.

pub mod entities;
pub mod errors;
pub mod pending;
pub mod state;

pub use entities::*;
pub use errors::*;
pub use pending::*;
pub use state::*;
