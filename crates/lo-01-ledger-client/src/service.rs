//! # Ledger Session
//!
//! The single, explicitly constructed handle every component uses to reach
//! the ledger. Created once at startup, shared by `Arc`, closed explicitly
//! on shutdown. After `shutdown()` every operation fails with
//! [`LedgerError::SessionClosed`].

use crate::domain::{LedgerError, NonceAllocator, NonceLease};
use crate::ports::LedgerClient;
use shared_types::{
    Address, ArgFilter, Bytes, ContractCall, DecodedEvent, EventDescriptor, FeePolicy, Hash,
    Receipt, TransactionHandle, UnsignedTransaction,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Bounded wait for a receipt.
    pub confirmation_timeout: Duration,
    /// Receipt polling interval.
    pub poll_interval: Duration,
    /// Fee policy applied to outgoing transactions.
    pub fees: FeePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
            fees: FeePolicy::default(),
        }
    }
}

/// Session statistics.
#[derive(Debug, Default)]
pub struct SessionStats {
    /// Transactions handed to the ledger.
    pub submitted: AtomicU64,
    /// Confirmations that timed out.
    pub confirmation_timeouts: AtomicU64,
}

/// Explicit ledger session.
pub struct LedgerSession {
    client: Arc<dyn LedgerClient>,
    nonces: NonceAllocator,
    config: SessionConfig,
    open: AtomicBool,
    stats: SessionStats,
}

impl LedgerSession {
    /// Open a session, checking the ledger is reachable.
    pub async fn connect(
        client: Arc<dyn LedgerClient>,
        config: SessionConfig,
    ) -> Result<Arc<Self>, LedgerError> {
        let head = client.block_number().await?;
        info!(
            head,
            confirmation_timeout_ms = config.confirmation_timeout.as_millis() as u64,
            "[lo-01] Ledger session opened"
        );
        Ok(Arc::new(Self {
            client,
            nonces: NonceAllocator::new(),
            config,
            open: AtomicBool::new(true),
            stats: SessionStats::default(),
        }))
    }

    /// Close the session.
    pub fn shutdown(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            info!(
                submitted = self.stats.submitted.load(Ordering::Relaxed),
                "[lo-01] Ledger session closed"
            );
        }
    }

    /// Whether the session accepts operations.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<&dyn LedgerClient, LedgerError> {
        if self.is_open() {
            Ok(self.client.as_ref())
        } else {
            Err(LedgerError::SessionClosed)
        }
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Default fee policy.
    pub fn fees(&self) -> &FeePolicy {
        &self.config.fees
    }

    /// Session statistics.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Accounts the ledger node custodies.
    pub async fn managed_accounts(&self) -> Result<Vec<Address>, LedgerError> {
        self.ensure_open()?.list_managed_accounts().await
    }

    /// Current head block.
    pub async fn block_number(&self) -> Result<u64, LedgerError> {
        self.ensure_open()?.block_number().await
    }

    /// Take the account's nonce sequence point.
    pub async fn lease_nonce(&self, account: Address) -> Result<NonceLease, LedgerError> {
        let client = self.ensure_open()?;
        self.nonces.lease(client, account).await
    }

    /// Return a reserved but unused nonce.
    pub async fn release_nonce(&self, account: Address, nonce: u64) {
        self.nonces.release(account, nonce).await;
    }

    /// Have the node sign and submit for a managed account.
    ///
    /// The lease is committed only once the ledger accepts the transaction.
    #[instrument(skip(self, lease, call), fields(account = %lease.account(), nonce = lease.nonce()))]
    pub async fn submit_managed(
        &self,
        lease: NonceLease,
        call: &ContractCall,
        fees: &FeePolicy,
    ) -> Result<TransactionHandle, LedgerError> {
        let client = self.ensure_open()?;
        let tx = UnsignedTransaction::assemble(lease.account(), call, fees, lease.nonce());
        let handle = client.sign_and_submit(&tx).await?;
        lease.commit();
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(handle)
    }

    /// Forward an externally signed payload.
    pub async fn submit_raw(&self, payload: &[u8]) -> Result<TransactionHandle, LedgerError> {
        let handle = self.ensure_open()?.submit_raw_transaction(payload).await?;
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(handle)
    }

    /// Wait for inclusion using the session's bounded timeout.
    pub async fn wait_for_confirmation(&self, hash: Hash) -> Result<Receipt, LedgerError> {
        let result = self
            .ensure_open()?
            .wait_for_confirmation(hash, self.config.confirmation_timeout, self.config.poll_interval)
            .await;
        if let Err(LedgerError::Timeout { .. }) = &result {
            self.stats.confirmation_timeouts.fetch_add(1, Ordering::Relaxed);
            warn!(tx_hash = %hash, "[lo-01] Confirmation timed out");
        }
        result
    }

    /// Decoded events over an inclusive block range.
    pub async fn query_events(
        &self,
        contract: Address,
        event: &EventDescriptor,
        filter: &ArgFilter,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<DecodedEvent>, LedgerError> {
        self.ensure_open()?
            .query_events(contract, event, filter, from_block, to_block)
            .await
    }

    /// Read-only contract call.
    pub async fn call(&self, to: Address, data: &[u8]) -> Result<Bytes, LedgerError> {
        self.ensure_open()?.call(to, data).await
    }

    /// Unlock a managed account for node-side signing.
    pub async fn unlock(
        &self,
        account: Address,
        password: &str,
        duration: Duration,
    ) -> Result<(), LedgerError> {
        self.ensure_open()?
            .unlock_account(account, password, duration)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryLedger;

    const ADMIN: Address = Address([0xAD; 20]);

    async fn session(ledger: Arc<InMemoryLedger>) -> Arc<LedgerSession> {
        let config = SessionConfig {
            confirmation_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(5),
            ..SessionConfig::default()
        };
        LedgerSession::connect(ledger, config).await.unwrap()
    }

    #[tokio::test]
    async fn test_connect_fails_when_offline() {
        let ledger = Arc::new(InMemoryLedger::new());
        ledger.set_offline(true);
        let result = LedgerSession::connect(ledger, SessionConfig::default()).await;
        assert!(matches!(result, Err(LedgerError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_submit_managed_commits_nonce() {
        let ledger = Arc::new(InMemoryLedger::new().with_managed_account(ADMIN));
        let session = session(Arc::clone(&ledger)).await;
        let call = ContractCall::new(Address([1; 20]), vec![]);

        for expected in 0..3 {
            let lease = session.lease_nonce(ADMIN).await.unwrap();
            assert_eq!(lease.nonce(), expected);
            let handle = session.submit_managed(lease, &call, session.fees()).await.unwrap();
            session.wait_for_confirmation(handle.hash).await.unwrap();
        }
        assert_eq!(session.stats().submitted.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn test_rejected_submission_keeps_nonce() {
        let ledger = Arc::new(InMemoryLedger::new().with_managed_account(ADMIN));
        let session = session(Arc::clone(&ledger)).await;
        let call = ContractCall::new(Address([1; 20]), vec![]);

        ledger.reject_next("boom");
        let lease = session.lease_nonce(ADMIN).await.unwrap();
        assert!(session.submit_managed(lease, &call, session.fees()).await.is_err());

        let lease = session.lease_nonce(ADMIN).await.unwrap();
        assert_eq!(lease.nonce(), 0);
    }

    #[tokio::test]
    async fn test_timeout_is_counted() {
        let ledger = Arc::new(InMemoryLedger::new().with_managed_account(ADMIN));
        ledger.set_hold_mining(true);
        let session = session(Arc::clone(&ledger)).await;
        let call = ContractCall::new(Address([1; 20]), vec![]);

        let lease = session.lease_nonce(ADMIN).await.unwrap();
        let handle = session.submit_managed(lease, &call, session.fees()).await.unwrap();
        let result = session.wait_for_confirmation(handle.hash).await;
        assert!(matches!(result, Err(LedgerError::Timeout { .. })));
        assert_eq!(session.stats().confirmation_timeouts.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_closed_session_refuses_work() {
        let ledger = Arc::new(InMemoryLedger::new());
        let session = session(ledger).await;
        session.shutdown();
        assert!(!session.is_open());
        assert!(matches!(
            session.block_number().await,
            Err(LedgerError::SessionClosed)
        ));
    }
}
