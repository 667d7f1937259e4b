//! # Ledger Orchestrator Test Suite
//!
//! Cross-component scenarios run against the in-memory ledger and the
//! contract emulators.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs   # Wired component stack over InMemoryLedger
//!     ├── scenarios.rs  # End-to-end deploy, pause/resume, confirmation faults
//!     ├── workflows.rs  # Runtime entry points: suites, upgrades, admins
//!     └── properties.rs # Type-id and version packing properties
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p lo-tests
//! cargo test -p lo-tests integration::scenarios::
//! ```

#![allow(dead_code)]

pub mod integration;
