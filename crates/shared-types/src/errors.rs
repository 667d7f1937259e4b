//! # Shared Error Types
//!
//! Errors raised while parsing hex values or encoding/decoding ABI data.

use thiserror::Error;

/// Failure to parse a `0x`-prefixed hex value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexError {
    /// The string contains non-hex characters or has an odd length.
    #[error("invalid hex string: {0}")]
    Invalid(String),

    /// The decoded value has the wrong width.
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Expected byte width
        expected: usize,
        /// Actual byte width
        got: usize,
    },
}

/// ABI encoding and decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// Data ended before a word or a dynamic payload could be read.
    #[error("unexpected end of data at offset {offset}")]
    UnexpectedEnd {
        /// Byte offset of the failed read
        offset: usize,
    },

    /// An offset or length word does not fit in memory.
    #[error("offset or length out of range")]
    Overflow,

    /// A bool word was neither 0 nor 1.
    #[error("invalid bool encoding")]
    InvalidBool,

    /// A string payload was not UTF-8.
    #[error("invalid utf-8 in string value")]
    InvalidUtf8,

    /// Argument count does not match the operation's parameter shape.
    #[error("expected {expected} arguments, got {got}")]
    ArityMismatch {
        /// Parameters declared
        expected: usize,
        /// Arguments supplied
        got: usize,
    },

    /// Argument kind does not match the declared parameter kind.
    #[error("argument {position} has kind {got}, expected {expected}")]
    KindMismatch {
        /// Zero-based argument position
        position: usize,
        /// Declared kind
        expected: String,
        /// Supplied kind
        got: String,
    },

    /// A log's first topic is not the event's signature hash.
    #[error("log does not belong to event {0}")]
    EventMismatch(String),

    /// Operation is not part of the capability table.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Event is not part of the capability table.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// ABI type string not supported by the codec.
    #[error("unsupported abi type: {0}")]
    UnsupportedType(String),

    /// Malformed ABI JSON document.
    #[error("malformed abi: {0}")]
    MalformedAbi(String),
}
