//! # Nonce Sequencing
//!
//! Per-account sequence point for nonce allocation.
//!
//! A [`NonceLease`] holds the account's lock from the moment the nonce is
//! read until the transaction has been handed to the ledger (delegated
//! path) or returned to the caller (external path). Two concurrent
//! dispatches for the same account therefore never observe the same
//! nonce. Accounts do not contend with each other.
//!
//! ```text
//! lease ──► nonce = max(pending count, last committed + 1)
//!   │                 (or the lowest released nonce still ahead of the ledger)
//!   ├── commit ──► reservation advances
//!   └── drop   ──► nothing reserved
//! ```

use crate::domain::LedgerError;
use crate::ports::LedgerClient;
use dashmap::DashMap;
use shared_types::Address;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct NonceSlot {
    /// Next nonce after the highest committed reservation.
    next: Option<u64>,
    /// Reservations abandoned before submission, reusable.
    released: BTreeSet<u64>,
}

/// Per-account nonce allocator.
#[derive(Debug, Default)]
pub struct NonceAllocator {
    slots: DashMap<Address, Arc<Mutex<NonceSlot>>>,
}

impl NonceAllocator {
    /// Create an empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, account: Address) -> Arc<Mutex<NonceSlot>> {
        Arc::clone(self.slots.entry(account).or_default().value())
    }

    /// Take the account's sequence point and pick the next nonce.
    ///
    /// The ledger's pending transaction count is read while the lock is
    /// held, so the value reflects every earlier committed submission.
    pub async fn lease(
        &self,
        client: &dyn LedgerClient,
        account: Address,
    ) -> Result<NonceLease, LedgerError> {
        let mut guard = self.slot(account).lock_owned().await;
        let pending = client.transaction_count(account).await?;

        // Released reservations behind the ledger were consumed out of band.
        guard.released = guard.released.split_off(&pending);

        let nonce = match guard.released.first() {
            Some(reused) => *reused,
            None => guard.next.map_or(pending, |next| next.max(pending)),
        };

        debug!(account = %account, nonce, pending, "[lo-01] Nonce leased");
        Ok(NonceLease {
            account,
            nonce,
            guard,
        })
    }

    /// Return an unused reservation so the account does not stall on a gap.
    pub async fn release(&self, account: Address, nonce: u64) {
        let slot = self.slot(account);
        let mut guard = slot.lock().await;
        if guard.next.is_some_and(|next| nonce < next) {
            guard.released.insert(nonce);
            debug!(account = %account, nonce, "[lo-01] Nonce released");
        }
    }
}

/// Exclusive hold on an account's next nonce.
#[derive(Debug)]
pub struct NonceLease {
    account: Address,
    nonce: u64,
    guard: OwnedMutexGuard<NonceSlot>,
}

impl NonceLease {
    /// Account the nonce belongs to.
    pub fn account(&self) -> Address {
        self.account
    }

    /// The leased nonce.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Record the nonce as used and release the account.
    pub fn commit(mut self) -> u64 {
        let nonce = self.nonce;
        self.guard.released.remove(&nonce);
        let next = self.guard.next.map_or(nonce + 1, |n| n.max(nonce + 1));
        self.guard.next = Some(next);
        nonce
    }
}
