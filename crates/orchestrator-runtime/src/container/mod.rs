//! # Component Container
//!
//! Configuration and dependency-ordered construction of every component.

pub mod components;
pub mod config;

pub use components::{read_keystore_address, ComponentContainer, StartupError};
pub use config::{ConfigError, LedgerProtocol, RuntimeConfig};
