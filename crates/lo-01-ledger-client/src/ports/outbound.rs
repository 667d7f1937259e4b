//! # Outbound Ports
//!
//! The ledger as seen by every other component.

use crate::domain::LedgerError;
use async_trait::async_trait;
use shared_types::{
    Address, ArgFilter, Bytes, DecodedEvent, EventDescriptor, Hash, LogEntry, Receipt,
    TransactionHandle, UnsignedTransaction, U256,
};
use std::time::Duration;
use tracing::debug;

/// Connectivity to the external ledger - outbound port.
///
/// Implementations perform exactly one ledger round-trip per call and never
/// retry; retry policy belongs to the caller.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Accounts whose keys the ledger node custodies, in node order.
    async fn list_managed_accounts(&self) -> Result<Vec<Address>, LedgerError>;

    /// Balance of an account at the latest block.
    async fn balance_of(&self, account: Address) -> Result<U256, LedgerError>;

    /// Current head block number.
    async fn block_number(&self) -> Result<u64, LedgerError>;

    /// Transaction count including pending transactions (the next nonce).
    async fn transaction_count(&self, account: Address) -> Result<u64, LedgerError>;

    /// Submit a payload signed by an external keyholder.
    async fn submit_raw_transaction(&self, payload: &[u8])
        -> Result<TransactionHandle, LedgerError>;

    /// Submit a transaction for a managed account; the node signs it.
    async fn sign_and_submit(
        &self,
        tx: &UnsignedTransaction,
    ) -> Result<TransactionHandle, LedgerError>;

    /// Receipt for an included transaction, `None` while pending.
    async fn transaction_receipt(&self, hash: Hash) -> Result<Option<Receipt>, LedgerError>;

    /// Raw logs of one contract over an inclusive block range.
    ///
    /// `topics` is positional; `None` matches any topic at that position.
    async fn query_logs(
        &self,
        contract: Address,
        topics: &[Option<Hash>],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, LedgerError>;

    /// Read-only contract call at the latest block.
    async fn call(&self, to: Address, data: &[u8]) -> Result<Bytes, LedgerError>;

    /// Unlock a managed account for node-side signing.
    async fn unlock_account(
        &self,
        account: Address,
        password: &str,
        duration: Duration,
    ) -> Result<(), LedgerError>;

    /// Poll for a receipt until it appears or `timeout` elapses.
    async fn wait_for_confirmation(
        &self,
        hash: Hash,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Receipt, LedgerError> {
        let poll = async {
            loop {
                if let Some(receipt) = self.transaction_receipt(hash).await? {
                    return Ok(receipt);
                }
                debug!(tx_hash = %hash, "[lo-01] Receipt not yet available");
                tokio::time::sleep(poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout {
                tx_hash: hash,
                waited: timeout,
            }),
        }
    }

    /// Decoded events of one contract matching a positional filter.
    ///
    /// Indexed positions are filtered by the ledger; the remaining positions
    /// are checked after decoding.
    async fn query_events(
        &self,
        contract: Address,
        event: &EventDescriptor,
        filter: &ArgFilter,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<DecodedEvent>, LedgerError> {
        let topics = filter.topics(event);
        let logs = self
            .query_logs(contract, &topics, from_block, to_block)
            .await?;

        let mut events = Vec::new();
        for log in logs.iter().filter(|log| event.matches_log(log)) {
            let decoded = event.decode(log)?;
            if filter.matches(event, &decoded) {
                events.push(decoded);
            }
        }

        debug!(
            event = event.name(),
            contract = %contract,
            from_block,
            to_block,
            matched = events.len(),
            "[lo-01] Event query"
        );
        Ok(events)
    }
}
