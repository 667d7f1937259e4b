//! # Contract ABI Codec
//!
//! Head/tail encoding of call data and log data as understood by the
//! external ledger's contract runtime.
//!
//! Static values occupy one 32-byte word in the head. Dynamic values
//! (`bytes`, `string`) put an offset in the head and a length-prefixed,
//! zero-padded payload in the tail.

use crate::entities::{keccak256, Address, Hash, U256};
use crate::errors::AbiError;
use std::fmt;

const WORD: usize = 32;

// =============================================================================
// PARAMETER KINDS
// =============================================================================

/// Shape of a single ABI parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// `address`
    Address,
    /// `bytesN` for N in 1..=32, left-aligned in its word.
    FixedBytes(u8),
    /// Any `uintN`, encoded as a 256-bit big-endian word.
    Uint,
    /// `bool`
    Bool,
    /// Dynamic `bytes`.
    Bytes,
    /// Dynamic UTF-8 `string`.
    String,
}

impl ParamKind {
    /// `bytes32`
    pub const BYTES32: Self = Self::FixedBytes(32);
    /// `bytes2`
    pub const BYTES2: Self = Self::FixedBytes(2);

    /// Whether the value lives in the tail.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Bytes | Self::String)
    }

    /// Parse a canonical ABI type string.
    pub fn parse(ty: &str) -> Result<Self, AbiError> {
        match ty {
            "address" => Ok(Self::Address),
            "bool" => Ok(Self::Bool),
            "bytes" => Ok(Self::Bytes),
            "string" => Ok(Self::String),
            "uint" => Ok(Self::Uint),
            _ => {
                if let Some(bits) = ty.strip_prefix("uint") {
                    match bits.parse::<u16>() {
                        Ok(n) if n % 8 == 0 && (8..=256).contains(&n) => Ok(Self::Uint),
                        _ => Err(AbiError::UnsupportedType(ty.to_string())),
                    }
                } else if let Some(width) = ty.strip_prefix("bytes") {
                    match width.parse::<u8>() {
                        Ok(n) if (1..=32).contains(&n) => Ok(Self::FixedBytes(n)),
                        _ => Err(AbiError::UnsupportedType(ty.to_string())),
                    }
                } else {
                    Err(AbiError::UnsupportedType(ty.to_string()))
                }
            }
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => write!(f, "address"),
            Self::FixedBytes(n) => write!(f, "bytes{n}"),
            Self::Uint => write!(f, "uint256"),
            Self::Bool => write!(f, "bool"),
            Self::Bytes => write!(f, "bytes"),
            Self::String => write!(f, "string"),
        }
    }
}

// =============================================================================
// TOKENS
// =============================================================================

/// A decoded or to-be-encoded ABI value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    /// Address value.
    Address(Address),
    /// Fixed-width bytes (width is the vector length).
    FixedBytes(Vec<u8>),
    /// Unsigned integer.
    Uint(U256),
    /// Boolean.
    Bool(bool),
    /// Dynamic bytes.
    Bytes(Vec<u8>),
    /// Dynamic string.
    String(String),
}

impl Token {
    /// A `bytes32` token from a hash.
    #[must_use]
    pub fn word(hash: Hash) -> Self {
        Self::FixedBytes(hash.0.to_vec())
    }

    /// A `bytes2` token from a packed 16-bit value.
    #[must_use]
    pub fn bytes2(value: u16) -> Self {
        Self::FixedBytes(value.to_be_bytes().to_vec())
    }

    /// The kind this token encodes as.
    #[must_use]
    pub fn kind(&self) -> ParamKind {
        match self {
            Self::Address(_) => ParamKind::Address,
            Self::FixedBytes(bytes) => ParamKind::FixedBytes(bytes.len() as u8),
            Self::Uint(_) => ParamKind::Uint,
            Self::Bool(_) => ParamKind::Bool,
            Self::Bytes(_) => ParamKind::Bytes,
            Self::String(_) => ParamKind::String,
        }
    }

    /// Whether the value lives in the tail.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.kind().is_dynamic()
    }

    /// Address payload, if any.
    #[must_use]
    pub fn as_address(&self) -> Option<Address> {
        match self {
            Self::Address(addr) => Some(*addr),
            _ => None,
        }
    }

    /// 32-byte payload as a hash, if this is a `bytes32`.
    #[must_use]
    pub fn as_hash(&self) -> Option<Hash> {
        match self {
            Self::FixedBytes(bytes) => Hash::from_slice(bytes),
            _ => None,
        }
    }

    /// Big-endian `u16` from a `bytes2` payload.
    #[must_use]
    pub fn as_bytes2(&self) -> Option<u16> {
        match self {
            Self::FixedBytes(bytes) if bytes.len() == 2 => Some(u16::from_be_bytes([bytes[0], bytes[1]])),
            _ => None,
        }
    }

    /// Integer payload, if any.
    #[must_use]
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Self::Uint(value) => Some(*value),
            _ => None,
        }
    }

    /// String payload, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// The 32-byte topic this value produces when indexed in an event.
    ///
    /// Dynamic values are indexed by the hash of their content.
    #[must_use]
    pub fn topic(&self) -> Hash {
        match self {
            Self::Bytes(bytes) => keccak256(bytes),
            Self::String(value) => keccak256(value.as_bytes()),
            other => Hash(static_word(other)),
        }
    }
}

impl From<Address> for Token {
    fn from(addr: Address) -> Self {
        Self::Address(addr)
    }
}

impl From<Hash> for Token {
    fn from(hash: Hash) -> Self {
        Self::word(hash)
    }
}

impl From<bool> for Token {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<U256> for Token {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// First four bytes of the Keccak-256 of a function signature.
#[must_use]
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash.0[0], hash.0[1], hash.0[2], hash.0[3]]
}

/// Canonical `name(type,type)` signature.
#[must_use]
pub fn signature(name: &str, kinds: &[ParamKind]) -> String {
    let params: Vec<String> = kinds.iter().map(ToString::to_string).collect();
    format!("{name}({})", params.join(","))
}

/// Encode a token sequence.
#[must_use]
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
            encode_dynamic(token, &mut tail);
        } else {
            head.extend_from_slice(&static_word(token));
        }
    }

    head.extend(tail);
    head
}

/// Selector followed by the encoded arguments.
#[must_use]
pub fn encode_call(selector: [u8; 4], tokens: &[Token]) -> Vec<u8> {
    let mut data = selector.to_vec();
    data.extend(encode(tokens));
    data
}

fn uint_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

fn static_word(token: &Token) -> [u8; 32] {
    match token {
        Token::Address(addr) => addr.to_word(),
        Token::FixedBytes(bytes) => {
            let mut word = [0u8; 32];
            let len = bytes.len().min(WORD);
            word[..len].copy_from_slice(&bytes[..len]);
            word
        }
        Token::Uint(value) => uint_word(*value),
        Token::Bool(value) => uint_word(U256::from(u8::from(*value))),
        Token::Bytes(_) | Token::String(_) => [0u8; 32],
    }
}

fn encode_dynamic(token: &Token, out: &mut Vec<u8>) {
    let payload: &[u8] = match token {
        Token::Bytes(bytes) => bytes,
        Token::String(value) => value.as_bytes(),
        _ => return,
    };
    out.extend_from_slice(&uint_word(U256::from(payload.len())));
    out.extend_from_slice(payload);
    let padding = (WORD - payload.len() % WORD) % WORD;
    out.extend(std::iter::repeat(0u8).take(padding));
}

// =============================================================================
// DECODING
// =============================================================================

/// Decode data laid out for the given parameter kinds.
pub fn decode(kinds: &[ParamKind], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let word = read_word(data, i * WORD)?;
            if kind.is_dynamic() {
                let offset = word_to_usize(&word)?;
                let len = word_to_usize(&read_word(data, offset)?)?;
                let start = offset.checked_add(WORD).ok_or(AbiError::Overflow)?;
                let end = start.checked_add(len).ok_or(AbiError::Overflow)?;
                let payload = data
                    .get(start..end)
                    .ok_or(AbiError::UnexpectedEnd { offset: start })?;
                match kind {
                    ParamKind::String => String::from_utf8(payload.to_vec())
                        .map(Token::String)
                        .map_err(|_| AbiError::InvalidUtf8),
                    _ => Ok(Token::Bytes(payload.to_vec())),
                }
            } else {
                decode_word(*kind, &word)
            }
        })
        .collect()
}

/// Decode a single static word (also used for indexed event topics).
pub fn decode_word(kind: ParamKind, word: &[u8; 32]) -> Result<Token, AbiError> {
    match kind {
        ParamKind::Address => Ok(Token::Address(Address::from_word(word))),
        ParamKind::FixedBytes(n) => Ok(Token::FixedBytes(word[..usize::from(n)].to_vec())),
        ParamKind::Uint => Ok(Token::Uint(U256::from_big_endian(word))),
        ParamKind::Bool => {
            if word[..31].iter().any(|b| *b != 0) || word[31] > 1 {
                return Err(AbiError::InvalidBool);
            }
            Ok(Token::Bool(word[31] == 1))
        }
        // Indexed dynamic values only survive as their content hash.
        ParamKind::Bytes | ParamKind::String => Ok(Token::FixedBytes(word.to_vec())),
    }
}

fn read_word(data: &[u8], offset: usize) -> Result<[u8; 32], AbiError> {
    let end = offset.checked_add(WORD).ok_or(AbiError::Overflow)?;
    data.get(offset..end)
        .and_then(|slice| <[u8; 32]>::try_from(slice).ok())
        .ok_or(AbiError::UnexpectedEnd { offset })
}

fn word_to_usize(word: &[u8; 32]) -> Result<usize, AbiError> {
    let value = U256::from_big_endian(word);
    if value.bits() > 32 {
        return Err(AbiError::Overflow);
    }
    Ok(value.low_u64() as usize)
}
