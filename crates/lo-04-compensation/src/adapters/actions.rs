//! Stock compensating actions.

use crate::domain::CompensationError;
use crate::ports::{CompensationAction, DocumentStore};
use async_trait::async_trait;
use lo_03_signer_dispatch::{SignerDecision, SignerDispatchApi};
use shared_types::{Address, ContractCall, FeePolicy};
use std::sync::Arc;
use tracing::debug;

/// Delete a just-saved local document.
pub struct DeleteDocumentAction {
    store: Arc<dyn DocumentStore>,
    collection: String,
    id: String,
}

impl DeleteDocumentAction {
    /// Inverse of saving `collection/id`.
    pub fn new(store: Arc<dyn DocumentStore>, collection: &str, id: &str) -> Self {
        Self {
            store,
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl CompensationAction for DeleteDocumentAction {
    fn describe(&self) -> String {
        format!("delete {}/{}", self.collection, self.id)
    }

    async fn compensate(&self) -> Result<(), CompensationError> {
        if !self.store.delete(&self.collection, &self.id).await? {
            debug!(collection = %self.collection, id = %self.id, "[lo-04] Document already gone");
        }
        Ok(())
    }
}

/// Dispatch an inverse contract call (e.g. revoke a just-granted role).
///
/// Only delegated accounts can be compensated server-side; an external
/// signer's inverse call is reported as a failure for manual follow-up.
pub struct LedgerCallAction {
    dispatcher: Arc<dyn SignerDispatchApi>,
    account: Address,
    call: ContractCall,
    fees: FeePolicy,
    description: String,
}

impl LedgerCallAction {
    /// Inverse call sent from `account`.
    pub fn new(
        dispatcher: Arc<dyn SignerDispatchApi>,
        account: Address,
        call: ContractCall,
        fees: FeePolicy,
        description: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            account,
            call,
            fees,
            description: description.into(),
        }
    }
}

#[async_trait]
impl CompensationAction for LedgerCallAction {
    fn describe(&self) -> String {
        self.description.clone()
    }

    async fn compensate(&self) -> Result<(), CompensationError> {
        let decision = self.dispatcher.classify(self.account).await?;
        if decision == SignerDecision::External {
            return Err(CompensationError::ExternalSigner(self.account));
        }
        self.dispatcher
            .dispatch_with(self.account, decision, &self.call, &self.fees)
            .await?;
        Ok(())
    }
}
