//! # Shared Types Crate
//!
//! Ledger primitives used by every orchestration component.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: addresses, hashes, ABI tokens and ledger
//!   records are defined once here and shared by all `lo-*` crates.
//! - **Wire Compatibility**: the ABI codec and the JSON shapes of logs,
//!   receipts and unsigned transactions match the external ledger's RPC
//!   surface byte for byte.
//! - **Static Capabilities**: contract operations are resolved once into a
//!   [`CapabilityTable`], never looked up by name at call time.
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | `entities` | `Address`, `Hash`, `Bytes`, `keccak256` |
//! | `abi` | `ParamKind`, `Token`, head/tail encoding |
//! | `events` | `EventDescriptor`, `DecodedEvent`, positional `ArgFilter` |
//! | `ledger` | `LogEntry`, `Receipt`, `TransactionHandle`, `UnsignedTransaction` |
//! | `capabilities` | `Capability`, `CapabilityTable` |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
pub mod capabilities;
pub mod entities;
pub mod errors;
pub mod events;
pub mod ledger;

pub use abi::{ParamKind, Token};
pub use capabilities::{Capability, CapabilityTable, Mutability};
pub use entities::*;
pub use errors::*;
pub use events::{ArgFilter, DecodedEvent, EventDescriptor, EventParam, FilterArg};
pub use ledger::*;
