//! In-memory ledger.
//!
//! Implements the `LedgerClient` port with a single-node ledger held in
//! process: managed accounts, per-account nonce queues, one block per mined
//! transaction, logs and receipts. Contract behaviour is supplied by
//! [`ContractEmulator`]s registered per address.
//!
//! Fault switches let callers reproduce the ledger conditions the
//! orchestrator must survive: an unreachable endpoint, transactions that
//! stay pending, receipts that never surface, and outright rejections.

use super::offline_signer::recover_envelope;
use crate::domain::LedgerError;
use crate::ports::LedgerClient;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{
    keccak256, Address, Bytes, Hash, LogEntry, Receipt, TransactionHandle, UnsignedTransaction,
    U256,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Timestamp of block 0.
const GENESIS_TIMESTAMP: u64 = 1_700_000_000;

/// Execution environment handed to an emulator.
#[derive(Clone, Copy, Debug)]
pub struct CallEnv {
    /// Contract being executed.
    pub contract: Address,
    /// Transaction sender (zero for read-only calls).
    pub sender: Address,
    /// Block the execution belongs to.
    pub block_number: u64,
    /// Block timestamp.
    pub timestamp: u64,
    /// Transaction hash (zero for read-only calls).
    pub transaction_hash: Hash,
}

/// A log produced by an emulator; the ledger fills in block and position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmittedLog {
    /// Emitting contract.
    pub address: Address,
    /// Topic words.
    pub topics: Vec<Hash>,
    /// ABI-encoded data.
    pub data: Vec<u8>,
}

/// Contract behaviour for the in-memory ledger.
pub trait ContractEmulator: Send + Sync {
    /// Execute a state-changing call. `Err` reverts the transaction.
    fn execute(&self, env: &CallEnv, data: &[u8]) -> Result<Vec<EmittedLog>, String>;

    /// Execute a read-only call.
    fn call(&self, env: &CallEnv, data: &[u8]) -> Result<Vec<u8>, String>;
}

#[derive(Debug)]
struct ManagedKey {
    password: String,
    unlocked: bool,
}

#[derive(Default)]
struct Faults {
    offline: bool,
    hold_mining: bool,
    hide_receipts: bool,
    reject_next: Option<String>,
}

struct LedgerState {
    block_number: u64,
    timestamp: u64,
    managed: Vec<Address>,
    keys: HashMap<Address, ManagedKey>,
    balances: HashMap<Address, U256>,
    /// Next nonce to execute per account.
    executed: HashMap<Address, u64>,
    /// Accepted, not yet mined, keyed by nonce.
    pending: BTreeMap<Address, BTreeMap<u64, UnsignedTransaction>>,
    receipts: HashMap<Hash, Receipt>,
    logs: Vec<LogEntry>,
    mined: Vec<TransactionHandle>,
    emulators: HashMap<Address, Arc<dyn ContractEmulator>>,
    faults: Faults,
}

impl Default for LedgerState {
    fn default() -> Self {
        Self {
            block_number: 0,
            timestamp: GENESIS_TIMESTAMP,
            managed: Vec::new(),
            keys: HashMap::new(),
            balances: HashMap::new(),
            executed: HashMap::new(),
            pending: BTreeMap::new(),
            receipts: HashMap::new(),
            logs: Vec::new(),
            mined: Vec::new(),
            emulators: HashMap::new(),
            faults: Faults::default(),
        }
    }
}

/// Single-node ledger held in memory.
#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryLedger {
    /// Empty ledger at block 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unlocked managed account.
    #[must_use]
    pub fn with_managed_account(self, account: Address) -> Self {
        self.add_managed_account(account, "", true);
        self
    }

    /// Add a managed account that must be unlocked before signing.
    #[must_use]
    pub fn with_locked_account(self, account: Address, password: &str) -> Self {
        self.add_managed_account(account, password, false);
        self
    }

    /// Credit an account.
    #[must_use]
    pub fn with_balance(self, account: Address, balance: U256) -> Self {
        self.state.lock().balances.insert(account, balance);
        self
    }

    fn add_managed_account(&self, account: Address, password: &str, unlocked: bool) {
        let mut state = self.state.lock();
        if !state.keys.contains_key(&account) {
            state.managed.push(account);
        }
        state.keys.insert(
            account,
            ManagedKey {
                password: password.to_string(),
                unlocked,
            },
        );
    }

    /// Attach contract behaviour to an address.
    pub fn register_emulator(&self, address: Address, emulator: Arc<dyn ContractEmulator>) {
        self.state.lock().emulators.insert(address, emulator);
    }

    /// Make every call fail as unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().faults.offline = offline;
    }

    /// Keep accepted transactions pending instead of mining them.
    pub fn set_hold_mining(&self, hold: bool) {
        self.state.lock().faults.hold_mining = hold;
    }

    /// Mine transactions but never report their receipts.
    pub fn set_hide_receipts(&self, hide: bool) {
        self.state.lock().faults.hide_receipts = hide;
    }

    /// Reject the next submission with a reason.
    pub fn reject_next(&self, reason: &str) {
        self.state.lock().faults.reject_next = Some(reason.to_string());
    }

    /// Stop holding and mine everything ready.
    pub fn mine_held(&self) {
        let mut state = self.state.lock();
        state.faults.hold_mining = false;
        mine_ready(&mut state);
    }

    /// Mine empty blocks.
    pub fn advance_blocks(&self, count: u64) {
        let mut state = self.state.lock();
        for _ in 0..count {
            open_block(&mut state);
        }
    }

    /// Mined transactions of an account, in inclusion order.
    pub fn mined_from(&self, account: Address) -> Vec<TransactionHandle> {
        self.state
            .lock()
            .mined
            .iter()
            .filter(|h| h.from == account)
            .copied()
            .collect()
    }

    /// Every log recorded so far.
    pub fn logs(&self) -> Vec<LogEntry> {
        self.state.lock().logs.clone()
    }

    fn check_online(state: &LedgerState) -> Result<(), LedgerError> {
        if state.faults.offline {
            return Err(LedgerError::Unavailable("in-memory ledger offline".into()));
        }
        Ok(())
    }

    fn accept(&self, tx: UnsignedTransaction) -> Result<TransactionHandle, LedgerError> {
        let mut state = self.state.lock();
        Self::check_online(&state)?;

        if let Some(reason) = state.faults.reject_next.take() {
            return Err(LedgerError::Rejected(reason));
        }

        let executed = state.executed.get(&tx.from).copied().unwrap_or(0);
        if tx.nonce < executed {
            return Err(LedgerError::Rejected(format!(
                "nonce too low: next nonce {executed}, tx nonce {}",
                tx.nonce
            )));
        }
        if state
            .pending
            .get(&tx.from)
            .is_some_and(|queue| queue.contains_key(&tx.nonce))
        {
            return Err(LedgerError::Rejected("already known".into()));
        }

        let cost = tx
            .gas_price
            .saturating_mul(U256::from(tx.gas_limit))
            .saturating_add(tx.value);
        let balance = state.balances.get(&tx.from).copied().unwrap_or_default();
        if cost > balance {
            return Err(LedgerError::Rejected(format!(
                "insufficient funds for gas * price + value: have {balance}, want {cost}"
            )));
        }

        let handle = TransactionHandle {
            hash: transaction_hash(&tx),
            from: tx.from,
            nonce: tx.nonce,
        };
        debug!(tx_hash = %handle.hash, from = %tx.from, nonce = tx.nonce, "[lo-01] Transaction accepted");

        state.pending.entry(tx.from).or_default().insert(tx.nonce, tx);
        if !state.faults.hold_mining {
            mine_ready(&mut state);
        }
        Ok(handle)
    }
}

fn transaction_hash(tx: &UnsignedTransaction) -> Hash {
    let mut buf = Vec::with_capacity(48 + tx.data.len());
    buf.extend_from_slice(tx.from.as_bytes());
    buf.extend_from_slice(&tx.nonce.to_be_bytes());
    buf.extend_from_slice(tx.to.as_bytes());
    buf.extend_from_slice(&tx.data);
    keccak256(buf)
}

fn open_block(state: &mut LedgerState) {
    state.block_number += 1;
    state.timestamp += 1;
}

/// Execute every transaction whose nonce is next for its account.
fn mine_ready(state: &mut LedgerState) {
    loop {
        let ready = state.pending.iter().find_map(|(account, queue)| {
            let next = state.executed.get(account).copied().unwrap_or(0);
            queue.contains_key(&next).then_some((*account, next))
        });
        let Some((account, nonce)) = ready else {
            break;
        };
        let Some(tx) = state.pending.get_mut(&account).and_then(|q| q.remove(&nonce)) else {
            break;
        };
        if state.pending.get(&account).is_some_and(BTreeMap::is_empty) {
            state.pending.remove(&account);
        }
        state.executed.insert(account, nonce + 1);
        execute(state, tx);
    }
}

fn execute(state: &mut LedgerState, tx: UnsignedTransaction) {
    open_block(state);
    let hash = transaction_hash(&tx);
    let env = CallEnv {
        contract: tx.to,
        sender: tx.from,
        block_number: state.block_number,
        timestamp: state.timestamp,
        transaction_hash: hash,
    };

    let outcome = match state.emulators.get(&tx.to) {
        Some(emulator) => emulator.execute(&env, &tx.data),
        None => Ok(Vec::new()),
    };

    let (status, emitted) = match outcome {
        Ok(logs) => (1, logs),
        Err(reason) => {
            debug!(tx_hash = %hash, reason = %reason, "[lo-01] Transaction reverted");
            (0, Vec::new())
        }
    };

    let logs: Vec<LogEntry> = emitted
        .into_iter()
        .enumerate()
        .map(|(index, log)| LogEntry {
            address: log.address,
            topics: log.topics,
            data: Bytes(log.data),
            block_number: state.block_number,
            transaction_hash: hash,
            log_index: index as u64,
        })
        .collect();
    state.logs.extend(logs.iter().cloned());

    let data_gas: u64 = tx.data.iter().map(|b| if *b == 0 { 4 } else { 16 }).sum();
    let receipt = Receipt {
        transaction_hash: hash,
        block_number: state.block_number,
        from: tx.from,
        to: Some(tx.to),
        contract_address: None,
        status,
        gas_used: (21_000 + data_gas).min(tx.gas_limit),
        logs,
    };
    state.receipts.insert(hash, receipt);
    state.mined.push(TransactionHandle {
        hash,
        from: tx.from,
        nonce: tx.nonce,
    });
}

fn pending_count(state: &LedgerState, account: Address) -> u64 {
    let mut next = state.executed.get(&account).copied().unwrap_or(0);
    if let Some(queue) = state.pending.get(&account) {
        while queue.contains_key(&next) {
            next += 1;
        }
    }
    next
}

fn topics_match(filter: &[Option<Hash>], topics: &[Hash]) -> bool {
    filter.iter().enumerate().all(|(i, wanted)| match wanted {
        None => true,
        Some(topic) => topics.get(i) == Some(topic),
    })
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn list_managed_accounts(&self) -> Result<Vec<Address>, LedgerError> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        Ok(state.managed.clone())
    }

    async fn balance_of(&self, account: Address) -> Result<U256, LedgerError> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        Ok(state.balances.get(&account).copied().unwrap_or_default())
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        Ok(state.block_number)
    }

    async fn transaction_count(&self, account: Address) -> Result<u64, LedgerError> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        Ok(pending_count(&state, account))
    }

    async fn submit_raw_transaction(
        &self,
        payload: &[u8],
    ) -> Result<TransactionHandle, LedgerError> {
        let tx = recover_envelope(payload)?;
        self.accept(tx)
    }

    async fn sign_and_submit(
        &self,
        tx: &UnsignedTransaction,
    ) -> Result<TransactionHandle, LedgerError> {
        {
            let state = self.state.lock();
            Self::check_online(&state)?;
            match state.keys.get(&tx.from) {
                None => {
                    return Err(LedgerError::Rejected(format!("unknown account {}", tx.from)));
                }
                Some(key) if !key.unlocked => {
                    return Err(LedgerError::Rejected(
                        "authentication needed: password or unlock".into(),
                    ));
                }
                Some(_) => {}
            }
        }
        self.accept(tx.clone())
    }

    async fn transaction_receipt(&self, hash: Hash) -> Result<Option<Receipt>, LedgerError> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        if state.faults.hide_receipts {
            return Ok(None);
        }
        Ok(state.receipts.get(&hash).cloned())
    }

    async fn query_logs(
        &self,
        contract: Address,
        topics: &[Option<Hash>],
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, LedgerError> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        Ok(state
            .logs
            .iter()
            .filter(|log| log.address == contract)
            .filter(|log| (from_block..=to_block).contains(&log.block_number))
            .filter(|log| topics_match(topics, &log.topics))
            .cloned()
            .collect())
    }

    async fn call(&self, to: Address, data: &[u8]) -> Result<Bytes, LedgerError> {
        let state = self.state.lock();
        Self::check_online(&state)?;
        let Some(emulator) = state.emulators.get(&to) else {
            return Ok(Bytes::new());
        };
        let env = CallEnv {
            contract: to,
            sender: Address::ZERO,
            block_number: state.block_number,
            timestamp: state.timestamp,
            transaction_hash: Hash::ZERO,
        };
        emulator
            .call(&env, data)
            .map(Bytes)
            .map_err(|reason| LedgerError::Rejected(format!("execution reverted: {reason}")))
    }

    async fn unlock_account(
        &self,
        account: Address,
        password: &str,
        duration: Duration,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock();
        Self::check_online(&state)?;
        let key = state
            .keys
            .get_mut(&account)
            .ok_or_else(|| LedgerError::Rejected(format!("unknown account {account}")))?;
        if key.password != password {
            return Err(LedgerError::Rejected(
                "could not decrypt key with given password".into(),
            ));
        }
        key.unlocked = true;
        info!(account = %account, duration_secs = duration.as_secs(), "[lo-01] Account unlocked");
        Ok(())
    }
}
