//! # Outbound Ports

use crate::domain::{CompensationError, StoreError};
use async_trait::async_trait;
use serde_json::Value;

/// Inverse of a committed step, supplied by the workflow that committed it.
#[async_trait]
pub trait CompensationAction: Send + Sync {
    /// Human-readable description for reports and logs.
    fn describe(&self) -> String;

    /// Undo the step. Called at most once.
    async fn compensate(&self) -> Result<(), CompensationError>;
}

/// Local document store - outbound port.
///
/// Single-document operations only; the core never spans documents in one
/// transaction.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Document by collection and id.
    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// First document whose top-level `field` equals `value`, with its id.
    async fn find_by(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Option<(String, Value)>, StoreError>;

    /// Insert or replace a document.
    async fn save(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError>;

    /// Delete a document; `false` when it did not exist.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
}
