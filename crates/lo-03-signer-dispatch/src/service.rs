//! # Dispatcher Service
//!
//! ```text
//! classify(account) ── managed? ──► Delegated(account)
//!                   └─ otherwise ─► External
//!
//! Delegated: lease nonce ─► node signs + submits ─► wait ─► Submitted(receipt)
//! External:  lease nonce ─► assemble with fees ─► commit ─► PendingSignature(tx)
//! ```
//!
//! Both paths take the account's nonce lease, so concurrent calls for one
//! account never share a nonce. On the external path the reservation is
//! committed when the transaction is handed back; the caller's signed
//! payload later consumes it.

use crate::domain::{DispatchError, DispatchOutcome, SignerDecision};
use crate::ports::SignerDispatchApi;
use async_trait::async_trait;
use lo_01_ledger_client::LedgerSession;
use shared_types::{
    Address, Bytes, ContractCall, FeePolicy, Receipt, TransactionHandle, UnsignedTransaction,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Dispatch counters.
#[derive(Debug, Default)]
pub struct DispatchStats {
    /// Calls signed and submitted by the server.
    pub delegated: AtomicU64,
    /// Calls handed back unsigned.
    pub external: AtomicU64,
    /// Externally signed payloads forwarded.
    pub forwarded: AtomicU64,
}

/// Dual-Signer Dispatcher.
pub struct Dispatcher {
    session: Arc<LedgerSession>,
    stats: DispatchStats,
}

impl Dispatcher {
    /// Dispatcher over a ledger session.
    pub fn new(session: Arc<LedgerSession>) -> Self {
        Self {
            session,
            stats: DispatchStats::default(),
        }
    }

    /// Dispatch counters.
    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    async fn submit_delegated(
        &self,
        account: Address,
        call: &ContractCall,
        fees: &FeePolicy,
    ) -> Result<Receipt, DispatchError> {
        let submitted_at_block = self
            .session
            .block_number()
            .await
            .map_err(DispatchError::Submission)?;
        let lease = self
            .session
            .lease_nonce(account)
            .await
            .map_err(DispatchError::Submission)?;
        let handle = self
            .session
            .submit_managed(lease, call, fees)
            .await
            .map_err(DispatchError::Submission)?;
        self.stats.delegated.fetch_add(1, Ordering::Relaxed);
        debug!(tx_hash = %handle.hash, nonce = handle.nonce, "[lo-03] Delegated call submitted");

        self.confirm(handle, submitted_at_block).await
    }

    async fn prepare_external(
        &self,
        account: Address,
        call: &ContractCall,
        fees: &FeePolicy,
    ) -> Result<UnsignedTransaction, DispatchError> {
        let lease = self
            .session
            .lease_nonce(account)
            .await
            .map_err(DispatchError::Submission)?;
        let tx = UnsignedTransaction::assemble(account, call, fees, lease.nonce());
        lease.commit();
        self.stats.external.fetch_add(1, Ordering::Relaxed);
        debug!(nonce = tx.nonce, "[lo-03] Unsigned transaction prepared");
        Ok(tx)
    }
}

#[async_trait]
impl SignerDispatchApi for Dispatcher {
    async fn classify(&self, account: Address) -> Result<SignerDecision, DispatchError> {
        let managed = self
            .session
            .managed_accounts()
            .await
            .map_err(DispatchError::SignerUnavailable)?;
        let decision = if managed.contains(&account) {
            SignerDecision::Delegated(account)
        } else {
            SignerDecision::External
        };
        debug!(account = %account, ?decision, "[lo-03] Signer classified");
        Ok(decision)
    }

    #[instrument(skip(self, call, fees), fields(to = %call.to))]
    async fn dispatch_with(
        &self,
        account: Address,
        decision: SignerDecision,
        call: &ContractCall,
        fees: &FeePolicy,
    ) -> Result<DispatchOutcome, DispatchError> {
        match decision {
            SignerDecision::Delegated(signer) => self
                .submit_delegated(signer, call, fees)
                .await
                .map(DispatchOutcome::Submitted),
            SignerDecision::External => self
                .prepare_external(account, call, fees)
                .await
                .map(DispatchOutcome::PendingSignature),
        }
    }

    async fn submit_signed(
        &self,
        payload: &[u8],
    ) -> Result<(TransactionHandle, u64), DispatchError> {
        let submitted_at_block = self
            .session
            .block_number()
            .await
            .map_err(DispatchError::Submission)?;
        let handle = self
            .session
            .submit_raw(payload)
            .await
            .map_err(DispatchError::Submission)?;
        self.stats.forwarded.fetch_add(1, Ordering::Relaxed);
        info!(
            tx_hash = %handle.hash,
            from = %handle.from,
            nonce = handle.nonce,
            "[lo-03] Signed payload forwarded"
        );
        Ok((handle, submitted_at_block))
    }

    async fn confirm(
        &self,
        handle: TransactionHandle,
        submitted_at_block: u64,
    ) -> Result<Receipt, DispatchError> {
        let receipt = self
            .session
            .wait_for_confirmation(handle.hash)
            .await
            .map_err(|source| DispatchError::Confirmation {
                handle,
                submitted_at_block,
                source,
            })?;
        if !receipt.succeeded() {
            return Err(DispatchError::Reverted {
                receipt: Box::new(receipt),
            });
        }
        Ok(receipt)
    }

    async fn call_view(&self, to: Address, data: &[u8]) -> Result<Bytes, DispatchError> {
        self.session
            .call(to, data)
            .await
            .map_err(DispatchError::View)
    }
}
