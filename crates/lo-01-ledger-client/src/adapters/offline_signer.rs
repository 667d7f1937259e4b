//! Offline signer for external keyholders.
//!
//! Produces the signed payload format accepted by [`InMemoryLedger`]:
//! a JSON envelope carrying the unsigned transaction and a 65-byte
//! recoverable secp256k1 signature (`r || s || v`) over its signing hash.
//! Production ledgers accept their own raw formats; the orchestrator only
//! ever forwards payloads opaquely.
//!
//! [`InMemoryLedger`]: super::InMemoryLedger

use crate::domain::SigningError;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use shared_types::{keccak256, Address, Bytes, Hash, UnsignedTransaction};

/// Signed payload envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedEnvelope {
    /// Transaction as returned by the dispatcher.
    pub transaction: UnsignedTransaction,
    /// `r || s || v` with `v` in {0, 1}.
    pub signature: Bytes,
}

/// Hash signed by the keyholder.
pub fn signing_hash(tx: &UnsignedTransaction) -> Hash {
    let mut buf = Vec::with_capacity(20 + 8 + 32 + 8 + 32 + tx.data.len());
    buf.extend_from_slice(tx.to.as_bytes());
    buf.extend_from_slice(&tx.nonce.to_be_bytes());
    let mut word = [0u8; 32];
    tx.gas_price.to_big_endian(&mut word);
    buf.extend_from_slice(&word);
    buf.extend_from_slice(&tx.gas_limit.to_be_bytes());
    tx.value.to_big_endian(&mut word);
    buf.extend_from_slice(&word);
    buf.extend_from_slice(&tx.data);
    keccak256(buf)
}

/// Ledger address of a public key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash.0[12..]);
    Address(address)
}

/// A keyholder outside the server.
pub struct OfflineSigner {
    key: SigningKey,
}

impl OfflineSigner {
    /// Fresh random key.
    pub fn random() -> Self {
        Self {
            key: SigningKey::random(&mut rand::thread_rng()),
        }
    }

    /// Key from 32 secret bytes.
    pub fn from_secret(secret: &[u8; 32]) -> Result<Self, SigningError> {
        SigningKey::from_slice(secret)
            .map(|key| Self { key })
            .map_err(|_| SigningError::InvalidSignature)
    }

    /// Address controlled by this key.
    pub fn address(&self) -> Address {
        address_of(self.key.verifying_key())
    }

    /// Sign a transaction and serialize the envelope.
    pub fn sign(&self, tx: &UnsignedTransaction) -> Result<Bytes, SigningError> {
        let hash = signing_hash(tx);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&hash.0)
            .map_err(|_| SigningError::InvalidSignature)?;

        let mut raw = signature.to_bytes().to_vec();
        raw.push(recovery_id.to_byte());

        let envelope = SignedEnvelope {
            transaction: tx.clone(),
            signature: Bytes(raw),
        };
        serde_json::to_vec(&envelope)
            .map(Bytes)
            .map_err(|e| SigningError::Malformed(e.to_string()))
    }
}

/// Decode an envelope and check its signature against the declared sender.
pub fn recover_envelope(payload: &[u8]) -> Result<UnsignedTransaction, SigningError> {
    let envelope: SignedEnvelope =
        serde_json::from_slice(payload).map_err(|e| SigningError::Malformed(e.to_string()))?;

    let raw = &envelope.signature;
    if raw.len() != 65 {
        return Err(SigningError::InvalidSignature);
    }
    let signature = Signature::from_slice(&raw[..64]).map_err(|_| SigningError::InvalidSignature)?;
    let recovery_id = RecoveryId::from_byte(raw[64]).ok_or(SigningError::InvalidSignature)?;

    let hash = signing_hash(&envelope.transaction);
    let key = VerifyingKey::recover_from_prehash(&hash.0, &signature, recovery_id)
        .map_err(|_| SigningError::InvalidSignature)?;

    let recovered = address_of(&key);
    if recovered != envelope.transaction.from {
        return Err(SigningError::SenderMismatch {
            claimed: envelope.transaction.from,
            recovered,
        });
    }
    Ok(envelope.transaction)
}
