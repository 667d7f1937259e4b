//! # Capability Tables
//!
//! A statically typed view of a contract's operations, built once per
//! component type. Each operation maps to its selector, parameter shape and
//! whether it mutates ledger state; events map to their descriptors.
//!
//! Callers resolve an operation once and reuse the [`Capability`] instead of
//! inspecting ABI fragments at call time.

use crate::abi::{self, ParamKind, Token};
use crate::errors::AbiError;
use crate::events::EventDescriptor;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Whether an operation changes ledger state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mutability {
    /// Read-only; executed with a call, never signed.
    View,
    /// State-changing; must be signed and submitted.
    Mutating,
}

/// One contract operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capability {
    /// Operation name.
    pub name: String,
    /// Parameter shape.
    pub params: Vec<ParamKind>,
    /// Return shape.
    pub outputs: Vec<ParamKind>,
    /// View or mutating.
    pub mutability: Mutability,
    /// Four-byte selector.
    pub selector: [u8; 4],
}

impl Capability {
    /// Build an operation, deriving its selector.
    pub fn new(
        name: &str,
        params: Vec<ParamKind>,
        outputs: Vec<ParamKind>,
        mutability: Mutability,
    ) -> Self {
        let selector = abi::function_selector(&abi::signature(name, &params));
        Self {
            name: name.to_string(),
            params,
            outputs,
            mutability,
            selector,
        }
    }

    /// Whether the operation must be signed.
    pub fn is_mutating(&self) -> bool {
        self.mutability == Mutability::Mutating
    }

    /// Encode call data after checking the arguments against the shape.
    pub fn encode_call(&self, args: &[Token]) -> Result<Vec<u8>, AbiError> {
        self.check_args(args)?;
        Ok(abi::encode_call(self.selector, args))
    }

    /// Encode arguments without a selector (initializer payloads).
    pub fn encode_args(&self, args: &[Token]) -> Result<Vec<u8>, AbiError> {
        self.check_args(args)?;
        Ok(abi::encode(args))
    }

    /// Decode return data.
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>, AbiError> {
        abi::decode(&self.outputs, data)
    }

    fn check_args(&self, args: &[Token]) -> Result<(), AbiError> {
        if args.len() != self.params.len() {
            return Err(AbiError::ArityMismatch {
                expected: self.params.len(),
                got: args.len(),
            });
        }
        for (position, (kind, arg)) in self.params.iter().zip(args).enumerate() {
            if arg.kind() != *kind {
                return Err(AbiError::KindMismatch {
                    position,
                    expected: kind.to_string(),
                    got: arg.kind().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Operations and events of one component type.
#[derive(Clone, Debug, Default)]
pub struct CapabilityTable {
    functions: HashMap<String, Capability>,
    events: HashMap<String, EventDescriptor>,
    initializer: Option<Capability>,
}

impl CapabilityTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an operation.
    #[must_use]
    pub fn with_function(mut self, capability: Capability) -> Self {
        self.insert_function(capability);
        self
    }

    /// Add an event.
    #[must_use]
    pub fn with_event(mut self, event: EventDescriptor) -> Self {
        self.events.insert(event.name().to_string(), event);
        self
    }

    fn insert_function(&mut self, capability: Capability) {
        if capability.name == "initialize" {
            self.initializer = Some(capability.clone());
        }
        self.functions.insert(capability.name.clone(), capability);
    }

    /// Look up an operation.
    pub fn function(&self, name: &str) -> Result<&Capability, AbiError> {
        self.functions
            .get(name)
            .ok_or_else(|| AbiError::UnknownFunction(name.to_string()))
    }

    /// Look up an operation by its four-byte selector.
    pub fn by_selector(&self, selector: &[u8]) -> Option<&Capability> {
        self.functions
            .values()
            .find(|capability| capability.selector[..] == *selector)
    }

    /// Look up an event.
    pub fn event(&self, name: &str) -> Result<&EventDescriptor, AbiError> {
        self.events
            .get(name)
            .ok_or_else(|| AbiError::UnknownEvent(name.to_string()))
    }

    /// The `initialize` operation used by upgradeable components, if any.
    pub fn initializer(&self) -> Option<&Capability> {
        self.initializer.as_ref()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the table has no operations.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Build from a JSON ABI array.
    ///
    /// Entries using types the codec does not support are skipped; the
    /// first overload of a name wins.
    pub fn from_abi_json(abi: &Value) -> Result<Self, AbiError> {
        let entries = abi
            .as_array()
            .ok_or_else(|| AbiError::MalformedAbi("abi is not an array".into()))?;

        let mut table = Self::new();
        for entry in entries {
            let kind = entry.get("type").and_then(Value::as_str).unwrap_or("function");
            let Some(name) = entry.get("name").and_then(Value::as_str) else {
                continue;
            };
            match kind {
                "function" => match parse_function(name, entry) {
                    Ok(function) if !table.functions.contains_key(name) => {
                        table.insert_function(function);
                    }
                    Ok(_) => {}
                    Err(err) => debug!(entry = name, error = %err, "Skipping unsupported abi entry"),
                },
                "event" => match parse_event(name, entry) {
                    Ok(event) => {
                        table.events.insert(name.to_string(), event);
                    }
                    Err(err) => debug!(entry = name, error = %err, "Skipping unsupported abi entry"),
                },
                _ => {}
            }
        }
        Ok(table)
    }
}

fn param_kinds(entry: &Value, field: &str) -> Result<Vec<ParamKind>, AbiError> {
    entry
        .get(field)
        .and_then(Value::as_array)
        .map(|params| {
            params
                .iter()
                .map(|p| {
                    let ty = p
                        .get("type")
                        .and_then(Value::as_str)
                        .ok_or_else(|| AbiError::MalformedAbi(format!("{field} without type")))?;
                    ParamKind::parse(ty)
                })
                .collect()
        })
        .unwrap_or_else(|| Ok(Vec::new()))
}

fn parse_function(name: &str, entry: &Value) -> Result<Capability, AbiError> {
    let view = match entry.get("stateMutability").and_then(Value::as_str) {
        Some(m) => m == "view" || m == "pure",
        None => entry.get("constant").and_then(Value::as_bool).unwrap_or(false),
    };
    let mutability = if view {
        Mutability::View
    } else {
        Mutability::Mutating
    };
    Ok(Capability::new(
        name,
        param_kinds(entry, "inputs")?,
        param_kinds(entry, "outputs")?,
        mutability,
    ))
}

fn parse_event(name: &str, entry: &Value) -> Result<EventDescriptor, AbiError> {
    let inputs = entry
        .get("inputs")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    inputs.iter().try_fold(EventDescriptor::new(name), |event, input| {
        let ty = input
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| AbiError::MalformedAbi("event input without type".into()))?;
        let kind = ParamKind::parse(ty)?;
        let param = input.get("name").and_then(Value::as_str).unwrap_or("");
        if input.get("indexed").and_then(Value::as_bool).unwrap_or(false) {
            Ok(event.indexed(param, kind))
        } else {
            Ok(event.param(param, kind))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Address;
    use serde_json::json;

    fn sample_abi() -> Value {
        json!([
            {"type": "constructor", "inputs": []},
            {"type": "function", "name": "initialize", "stateMutability": "nonpayable",
             "inputs": [{"name": "registry", "type": "address"}, {"name": "owner", "type": "address"}],
             "outputs": []},
            {"type": "function", "name": "owner", "stateMutability": "view",
             "inputs": [], "outputs": [{"name": "", "type": "address"}]},
            {"type": "function", "name": "legacy", "constant": true, "inputs": [], "outputs": []},
            {"type": "function", "name": "batch",
             "inputs": [{"name": "items", "type": "tuple[]"}], "outputs": []},
            {"type": "event", "name": "Initialized", "anonymous": false,
             "inputs": [{"name": "registry", "type": "address", "indexed": false},
                        {"name": "owner", "type": "address", "indexed": true}]}
        ])
    }

    #[test]
    fn test_from_abi_classifies_mutability() {
        let table = CapabilityTable::from_abi_json(&sample_abi()).unwrap();
        assert!(table.function("initialize").unwrap().is_mutating());
        assert!(!table.function("owner").unwrap().is_mutating());
        assert!(!table.function("legacy").unwrap().is_mutating());
    }

    #[test]
    fn test_unsupported_entries_skipped() {
        let table = CapabilityTable::from_abi_json(&sample_abi()).unwrap();
        assert!(matches!(table.function("batch"), Err(AbiError::UnknownFunction(_))));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_initializer_detected() {
        let table = CapabilityTable::from_abi_json(&sample_abi()).unwrap();
        let init = table.initializer().unwrap();
        assert_eq!(init.params, vec![ParamKind::Address, ParamKind::Address]);
    }

    #[test]
    fn test_event_indexing_preserved() {
        let table = CapabilityTable::from_abi_json(&sample_abi()).unwrap();
        let event = table.event("Initialized").unwrap();
        assert!(!event.params()[0].indexed);
        assert!(event.params()[1].indexed);
    }

    #[test]
    fn test_encode_call_checks_shape() {
        let table = CapabilityTable::from_abi_json(&sample_abi()).unwrap();
        let init = table.function("initialize").unwrap();

        let ok = init.encode_call(&[Address([1; 20]).into(), Address([2; 20]).into()]);
        assert_eq!(ok.unwrap().len(), 4 + 64);

        let arity = init.encode_call(&[Address([1; 20]).into()]);
        assert!(matches!(arity, Err(AbiError::ArityMismatch { expected: 2, got: 1 })));

        let kind = init.encode_call(&[Token::Bool(true), Address([2; 20]).into()]);
        assert!(matches!(kind, Err(AbiError::KindMismatch { position: 0, .. })));
    }

    #[test]
    fn test_non_array_abi_rejected() {
        assert!(CapabilityTable::from_abi_json(&json!({})).is_err());
    }
}
