//! # Ledger Records
//!
//! Logs, receipts, transaction handles and the unsigned-transaction wire
//! format handed to external signers.
//!
//! Field names and hex quantities follow the ledger's JSON-RPC encoding so
//! the same types deserialize directly from node responses.

use crate::entities::{Address, Bytes, Hash, U256};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{serde_as, DeserializeAs, SerializeAs};

/// Gas limit applied when no policy overrides it.
pub const DEFAULT_GAS_LIMIT: u64 = 0x23c3_ffff;

// =============================================================================
// QUANTITY ENCODING
// =============================================================================

/// `serde_with` adapter for `0x`-prefixed hex quantities.
///
/// Deserialization also accepts plain JSON numbers.
pub struct Quantity;

impl SerializeAs<u64> for Quantity {
    fn serialize_as<S: Serializer>(source: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{source:#x}"))
    }
}

impl<'de> DeserializeAs<'de, u64> for Quantity {
    fn deserialize_as<D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(text) => parse_quantity(&text).map_err(de::Error::custom),
        }
    }
}

/// Parse a hex (`0x..`) or decimal quantity.
pub fn parse_quantity(text: &str) -> Result<u64, String> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some("") => Ok(0),
        Some(hex) => u64::from_str_radix(hex, 16).map_err(|e| format!("{text}: {e}")),
        None => text.parse().map_err(|e| format!("{text}: {e}")),
    }
}

// =============================================================================
// LOGS & RECEIPTS
// =============================================================================

/// A raw log emitted by a contract.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Emitting contract.
    pub address: Address,
    /// Topic words; the first is the event signature hash.
    pub topics: Vec<Hash>,
    /// Non-indexed arguments, ABI-encoded.
    pub data: Bytes,
    /// Block the log was included in.
    #[serde_as(as = "Quantity")]
    pub block_number: u64,
    /// Transaction that emitted the log.
    pub transaction_hash: Hash,
    /// Position of the log within the block.
    #[serde_as(as = "Quantity")]
    pub log_index: u64,
}

/// Proof of inclusion for a submitted transaction.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Transaction hash.
    pub transaction_hash: Hash,
    /// Including block.
    #[serde_as(as = "Quantity")]
    pub block_number: u64,
    /// Sender.
    pub from: Address,
    /// Target contract, absent for contract creation.
    pub to: Option<Address>,
    /// Created contract, if any.
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// `1` on success, `0` on revert.
    #[serde_as(as = "Quantity")]
    pub status: u64,
    /// Gas consumed.
    #[serde_as(as = "Quantity")]
    pub gas_used: u64,
    /// Logs emitted during execution.
    pub logs: Vec<LogEntry>,
}

impl Receipt {
    /// Whether execution succeeded.
    pub fn succeeded(&self) -> bool {
        self.status == 1
    }
}

/// Handle returned when a transaction is accepted by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionHandle {
    /// Transaction hash.
    pub hash: Hash,
    /// Sender recovered from the signed payload.
    pub from: Address,
    /// Sender nonce consumed by the transaction.
    pub nonce: u64,
}

// =============================================================================
// OUTGOING CALLS
// =============================================================================

/// A state-changing call before fee fields are assigned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCall {
    /// Target contract.
    pub to: Address,
    /// ABI-encoded call data.
    pub data: Bytes,
    /// Value transferred with the call.
    pub value: U256,
}

impl ContractCall {
    /// Zero-value call.
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            value: U256::zero(),
        }
    }
}

/// Gas price and limit applied to outgoing transactions.
#[serde_as]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePolicy {
    /// Gas price in base units.
    pub gas_price: U256,
    /// Gas limit.
    #[serde_as(as = "Quantity")]
    pub gas_limit: u64,
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            gas_price: U256::zero(),
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

/// Transaction with every fee field populated, ready for signing.
///
/// This is the wire format returned to external keyholders.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    /// Account expected to sign.
    pub from: Address,
    /// Target contract.
    pub to: Address,
    /// Call data.
    pub data: Bytes,
    /// Gas price.
    pub gas_price: U256,
    /// Gas limit.
    #[serde_as(as = "Quantity")]
    pub gas_limit: u64,
    /// Sender nonce.
    #[serde_as(as = "Quantity")]
    pub nonce: u64,
    /// Value transferred.
    pub value: U256,
}

impl UnsignedTransaction {
    /// Assemble from a call, a fee policy and an allocated nonce.
    pub fn assemble(from: Address, call: &ContractCall, fees: &FeePolicy, nonce: u64) -> Self {
        Self {
            from,
            to: call.to,
            data: call.data.clone(),
            gas_price: fees.gas_price,
            gas_limit: fees.gas_limit,
            nonce,
            value: call.value,
        }
    }
}
