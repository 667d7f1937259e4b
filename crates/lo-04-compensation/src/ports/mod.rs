//! # Ports Layer
//!
//! Compensating actions and the local document store.

pub mod outbound;

pub use outbound::*;
