//! # Adapters Layer
//!
//! Stock compensating actions and the in-memory document store.

pub mod actions;
pub mod memory_store;

pub use actions::{DeleteDocumentAction, LedgerCallAction};
pub use memory_store::InMemoryDocumentStore;
