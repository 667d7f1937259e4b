//! # Domain Layer
//!
//! Signer decisions, dispatch outcomes and errors.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
