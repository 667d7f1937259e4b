//! # Contract Events
//!
//! Event descriptors, log decoding and positional argument filters.
//!
//! A filter is a list of positions over the event's declared parameters.
//! Each position is either a wildcard or an exact value; positions past the
//! end of the filter are wildcards. Indexed positions are pushed to the
//! ledger as topic filters, the rest are checked after decoding.

use crate::abi::{self, ParamKind, Token};
use crate::entities::{keccak256, Address, Hash};
use crate::errors::AbiError;
use crate::ledger::LogEntry;

/// One declared event parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventParam {
    /// Parameter name as declared in the ABI.
    pub name: String,
    /// Parameter shape.
    pub kind: ParamKind,
    /// Whether the value is carried in a topic.
    pub indexed: bool,
}

/// Static description of a contract event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventDescriptor {
    name: String,
    params: Vec<EventParam>,
}

impl EventDescriptor {
    /// Start a descriptor with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append an indexed parameter.
    #[must_use]
    pub fn indexed(mut self, name: &str, kind: ParamKind) -> Self {
        self.params.push(EventParam {
            name: name.to_string(),
            kind,
            indexed: true,
        });
        self
    }

    /// Append a non-indexed parameter.
    #[must_use]
    pub fn param(mut self, name: &str, kind: ParamKind) -> Self {
        self.params.push(EventParam {
            name: name.to_string(),
            kind,
            indexed: false,
        });
        self
    }

    /// Event name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameters in positional order.
    pub fn params(&self) -> &[EventParam] {
        &self.params
    }

    /// Canonical `Name(type,...)` signature.
    pub fn signature(&self) -> String {
        let kinds: Vec<ParamKind> = self.params.iter().map(|p| p.kind).collect();
        abi::signature(&self.name, &kinds)
    }

    /// First topic of every log emitted for this event.
    pub fn topic0(&self) -> Hash {
        keccak256(self.signature().as_bytes())
    }

    /// Whether a log was emitted for this event.
    pub fn matches_log(&self, log: &LogEntry) -> bool {
        log.topics.first() == Some(&self.topic0())
    }

    /// Decode a log into positional arguments.
    pub fn decode(&self, log: &LogEntry) -> Result<DecodedEvent, AbiError> {
        if !self.matches_log(log) {
            return Err(AbiError::EventMismatch(self.name.clone()));
        }

        let data_kinds: Vec<ParamKind> = self
            .params
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.kind)
            .collect();
        let mut data_values = abi::decode(&data_kinds, &log.data)?.into_iter();
        let mut topics = log.topics.iter().skip(1);

        let mut args = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let token = if param.indexed {
                let topic = topics.next().ok_or(AbiError::UnexpectedEnd {
                    offset: log.topics.len() * 32,
                })?;
                abi::decode_word(param.kind, &topic.0)?
            } else {
                data_values.next().ok_or(AbiError::UnexpectedEnd {
                    offset: log.data.len(),
                })?
            };
            args.push(token);
        }

        Ok(DecodedEvent {
            name: self.name.clone(),
            address: log.address,
            args,
            block_number: log.block_number,
            transaction_hash: log.transaction_hash,
            log_index: log.log_index,
        })
    }

    /// Build the `(topics, data)` pair a contract would emit for these args.
    pub fn encode_log(&self, args: &[Token]) -> Result<(Vec<Hash>, Vec<u8>), AbiError> {
        if args.len() != self.params.len() {
            return Err(AbiError::ArityMismatch {
                expected: self.params.len(),
                got: args.len(),
            });
        }
        let mut topics = vec![self.topic0()];
        let mut data = Vec::new();
        for (param, arg) in self.params.iter().zip(args) {
            if param.indexed {
                topics.push(arg.topic());
            } else {
                data.push(arg.clone());
            }
        }
        Ok((topics, abi::encode(&data)))
    }
}

/// An event decoded from a ledger log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedEvent {
    /// Event name.
    pub name: String,
    /// Emitting contract.
    pub address: Address,
    /// Arguments in declared order.
    pub args: Vec<Token>,
    /// Block the log was included in.
    pub block_number: u64,
    /// Transaction that emitted the log.
    pub transaction_hash: Hash,
    /// Position of the log within the block.
    pub log_index: u64,
}

impl DecodedEvent {
    /// Argument at a position.
    pub fn arg(&self, position: usize) -> Option<&Token> {
        self.args.get(position)
    }

    /// Address argument at a position.
    pub fn address_arg(&self, position: usize) -> Option<Address> {
        self.arg(position).and_then(Token::as_address)
    }

    /// `bytes32` argument at a position.
    pub fn hash_arg(&self, position: usize) -> Option<Hash> {
        self.arg(position).and_then(Token::as_hash)
    }
}

// =============================================================================
// POSITIONAL FILTERS
// =============================================================================

/// One filter position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FilterArg {
    /// Matches anything.
    #[default]
    Any,
    /// Matches exactly this value.
    Exact(Token),
}

/// Positional argument filter for event queries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArgFilter {
    positions: Vec<FilterArg>,
}

impl ArgFilter {
    /// A filter that matches every event.
    pub fn any() -> Self {
        Self::default()
    }

    /// Build from explicit positions (`None` is a wildcard).
    pub fn from_options(positions: Vec<Option<Token>>) -> Self {
        Self {
            positions: positions
                .into_iter()
                .map(|p| p.map_or(FilterArg::Any, FilterArg::Exact))
                .collect(),
        }
    }

    /// Append a wildcard position.
    #[must_use]
    pub fn wildcard(mut self) -> Self {
        self.positions.push(FilterArg::Any);
        self
    }

    /// Append an exact-match position.
    #[must_use]
    pub fn exact(mut self, value: impl Into<Token>) -> Self {
        self.positions.push(FilterArg::Exact(value.into()));
        self
    }

    /// Filter positions.
    pub fn positions(&self) -> &[FilterArg] {
        &self.positions
    }

    /// Topic filter for the ledger: `topic0` then one entry per indexed
    /// parameter, `None` where the position is a wildcard. Trailing
    /// wildcards are dropped.
    pub fn topics(&self, event: &EventDescriptor) -> Vec<Option<Hash>> {
        let mut topics = vec![Some(event.topic0())];
        for (position, param) in event.params().iter().enumerate() {
            if !param.indexed {
                continue;
            }
            topics.push(match self.positions.get(position) {
                Some(FilterArg::Exact(token)) => Some(token.topic()),
                _ => None,
            });
        }
        while topics.len() > 1 && topics.last() == Some(&None) {
            topics.pop();
        }
        topics
    }

    /// Whether a decoded event satisfies every exact position.
    pub fn matches(&self, event: &EventDescriptor, decoded: &DecodedEvent) -> bool {
        self.positions
            .iter()
            .enumerate()
            .all(|(position, filter)| match filter {
                FilterArg::Any => true,
                FilterArg::Exact(expected) => {
                    let Some(actual) = decoded.arg(position) else {
                        return false;
                    };
                    let indexed_dynamic = event
                        .params()
                        .get(position)
                        .is_some_and(|p| p.indexed && p.kind.is_dynamic());
                    if indexed_dynamic {
                        actual.as_hash() == Some(expected.topic())
                    } else {
                        actual == expected
                    }
                }
            })
    }
}
