//! # Inbound Ports
//!
//! API exposed by the Dual-Signer Dispatcher.

use crate::domain::{DispatchError, DispatchOutcome, SignerDecision};
use async_trait::async_trait;
use shared_types::{Address, Bytes, ContractCall, FeePolicy, Receipt, TransactionHandle};

/// Dual-Signer Dispatcher API - inbound port.
#[async_trait]
pub trait SignerDispatchApi: Send + Sync {
    /// Decide who signs for `account`.
    async fn classify(&self, account: Address) -> Result<SignerDecision, DispatchError>;

    /// Execute or defer a call using an already computed decision.
    async fn dispatch_with(
        &self,
        account: Address,
        decision: SignerDecision,
        call: &ContractCall,
        fees: &FeePolicy,
    ) -> Result<DispatchOutcome, DispatchError>;

    /// Forward an externally signed payload, returning its handle and the
    /// head block just before submission.
    async fn submit_signed(
        &self,
        payload: &[u8],
    ) -> Result<(TransactionHandle, u64), DispatchError>;

    /// Wait for a submitted transaction and require a successful status.
    async fn confirm(
        &self,
        handle: TransactionHandle,
        submitted_at_block: u64,
    ) -> Result<Receipt, DispatchError>;

    /// Read-only call; never signed.
    async fn call_view(&self, to: Address, data: &[u8]) -> Result<Bytes, DispatchError>;

    /// Classify, then execute or defer.
    async fn dispatch(
        &self,
        account: Address,
        call: &ContractCall,
        fees: &FeePolicy,
    ) -> Result<DispatchOutcome, DispatchError> {
        let decision = self.classify(account).await?;
        self.dispatch_with(account, decision, call, fees).await
    }
}
