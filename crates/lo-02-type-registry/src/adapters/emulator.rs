//! In-memory registry contract.
//!
//! Executes the registry's operations for [`InMemoryLedger`], emitting the
//! same events as the deployed registry. Deployed addresses are derived
//! CREATE2-style from the registry address, the caller's salt and the code
//! hash, so a repeated salt with the same code collides and reverts.
//!
//! Fault switches:
//! - `set_collapse_addresses`: the proxy is placed on the logic address
//! - `set_suppress_events`: operations succeed without emitting events
//! - `set_duplicate_events`: every event is emitted twice
//!
//! [`InMemoryLedger`]: lo_01_ledger_client::InMemoryLedger

use crate::domain::contract::{
    DEPLOYED, DEPLOY_CONTRACT, GET_RECORD, GET_TYPE, GET_TYPE_BY_NAME, NEW_TYPE, SET_TYPE,
    SET_VERSION, UPGRADED, UPGRADE_CONTRACT, VERSION_UPDATED,
};
use crate::domain::{type_id_for, REGISTRY_ABI};
use lo_01_ledger_client::{CallEnv, ContractEmulator, EmittedLog};
use parking_lot::Mutex;
use shared_types::{abi, keccak256, Address, Hash, Token, U256};
use std::collections::HashMap;
use tracing::debug;

#[derive(Clone, Debug)]
struct TypeEntry {
    name: String,
    version: u16,
}

#[derive(Clone, Debug)]
struct RecordEntry {
    logic: Address,
    owner: Address,
    type_id: Hash,
    version: u16,
    created: u64,
    updated: u64,
}

#[derive(Default)]
struct RegistryState {
    types: HashMap<Hash, TypeEntry>,
    records: HashMap<Address, RecordEntry>,
    /// Every address handed out, to detect CREATE2 collisions.
    occupied: HashMap<Address, Hash>,
    collapse_addresses: bool,
    suppress_events: bool,
    duplicate_events: bool,
}

/// Registry contract emulator.
#[derive(Default)]
pub struct RegistryEmulator {
    state: Mutex<RegistryState>,
}

impl RegistryEmulator {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place proxies on their logic address.
    pub fn set_collapse_addresses(&self, collapse: bool) {
        self.state.lock().collapse_addresses = collapse;
    }

    /// Succeed without emitting events.
    pub fn set_suppress_events(&self, suppress: bool) {
        self.state.lock().suppress_events = suppress;
    }

    /// Emit every event twice.
    pub fn set_duplicate_events(&self, duplicate: bool) {
        self.state.lock().duplicate_events = duplicate;
    }

    /// Number of registered types.
    pub fn type_count(&self) -> usize {
        self.state.lock().types.len()
    }

    /// Proxies with a record.
    pub fn proxies(&self) -> Vec<Address> {
        self.state.lock().records.keys().copied().collect()
    }
}

/// `keccak256(0xff ++ deployer ++ salt ++ code_hash)[12..]`
fn create2_address(deployer: Address, salt: &Hash, code_hash: &Hash) -> Address {
    let mut buf = Vec::with_capacity(1 + 20 + 32 + 32);
    buf.push(0xff);
    buf.extend_from_slice(deployer.as_bytes());
    buf.extend_from_slice(salt.as_bytes());
    buf.extend_from_slice(code_hash.as_bytes());
    Address::from_word(&keccak256(buf).0)
}

/// Code hash of the proxy placed in front of `logic`.
fn proxy_code_hash(logic: Address) -> Hash {
    let mut code = b"proxy:".to_vec();
    code.extend_from_slice(logic.as_bytes());
    keccak256(code)
}

struct Execution<'a> {
    env: &'a CallEnv,
    state: &'a mut RegistryState,
    logs: Vec<EmittedLog>,
}

impl Execution<'_> {
    fn emit(&mut self, event: &str, args: &[Token]) -> Result<(), String> {
        if self.state.suppress_events {
            return Ok(());
        }
        let descriptor = REGISTRY_ABI.event(event).map_err(|e| e.to_string())?;
        let (topics, data) = descriptor.encode_log(args).map_err(|e| e.to_string())?;
        let copies = if self.state.duplicate_events { 2 } else { 1 };
        for _ in 0..copies {
            self.logs.push(EmittedLog {
                address: self.env.contract,
                topics: topics.clone(),
                data: data.clone(),
            });
        }
        Ok(())
    }

    /// Address for `code_hash` under `salt`, failing if already taken.
    fn vacant(&self, salt: &Hash, code_hash: &Hash) -> Result<Address, String> {
        let address = create2_address(self.env.contract, salt, code_hash);
        if self.state.occupied.contains_key(&address) {
            return Err(format!("create2 collision at {address}"));
        }
        Ok(address)
    }

    fn set_type(&mut self, args: &[Token]) -> Result<(), String> {
        let name = string_arg(args, 0)?;
        let version = bytes2_arg(args, 1)?;
        let id = type_id_for(&name);
        if self.state.types.contains_key(&id) {
            return Err(format!("type '{name}' already exists"));
        }
        self.state.types.insert(
            id,
            TypeEntry {
                name: name.clone(),
                version,
            },
        );
        self.emit(
            NEW_TYPE,
            &[Token::word(id), Token::String(name), Token::bytes2(version)],
        )
    }

    fn set_version(&mut self, args: &[Token]) -> Result<(), String> {
        let id = hash_arg(args, 0)?;
        let version = bytes2_arg(args, 1)?;
        let entry = self
            .state
            .types
            .get_mut(&id)
            .ok_or_else(|| format!("type {id} not found"))?;
        let old = std::mem::replace(&mut entry.version, version);
        self.emit(
            VERSION_UPDATED,
            &[Token::word(id), Token::bytes2(old), Token::bytes2(version)],
        )
    }

    fn deploy(&mut self, args: &[Token]) -> Result<(), String> {
        let code = bytes_arg(args, 0)?;
        let salt = hash_arg(args, 2)?;
        let type_id = hash_arg(args, 3)?;
        let version = self
            .state
            .types
            .get(&type_id)
            .map(|entry| entry.version)
            .ok_or_else(|| format!("type {type_id} not registered"))?;

        let code_hash = keccak256(&code);
        let logic = self.vacant(&salt, &code_hash)?;
        let proxy = if self.state.collapse_addresses {
            logic
        } else {
            self.vacant(&salt, &proxy_code_hash(logic))?
        };
        self.state.occupied.insert(logic, code_hash);
        self.state.occupied.insert(proxy, proxy_code_hash(logic));

        let owner = self.env.sender;
        self.state.records.insert(
            proxy,
            RecordEntry {
                logic,
                owner,
                type_id,
                version,
                created: self.env.timestamp,
                updated: self.env.timestamp,
            },
        );
        self.emit(
            DEPLOYED,
            &[
                Token::Address(proxy),
                Token::Address(logic),
                Token::Address(owner),
                Token::word(type_id),
                Token::word(salt),
            ],
        )
    }

    fn upgrade(&mut self, args: &[Token]) -> Result<(), String> {
        let proxy = address_arg(args, 0)?;
        let code = bytes_arg(args, 1)?;
        let salt = hash_arg(args, 2)?;

        let record = self
            .state
            .records
            .get(&proxy)
            .cloned()
            .ok_or_else(|| format!("no record for {proxy}"))?;
        if record.owner != self.env.sender {
            return Err("caller is not the owner".into());
        }
        let version = self
            .state
            .types
            .get(&record.type_id)
            .map_or(record.version, |entry| entry.version);

        let new_logic = if self.state.collapse_addresses {
            proxy
        } else {
            let code_hash = keccak256(&code);
            let address = self.vacant(&salt, &code_hash)?;
            self.state.occupied.insert(address, code_hash);
            address
        };

        if let Some(entry) = self.state.records.get_mut(&proxy) {
            entry.logic = new_logic;
            entry.version = version;
            entry.updated = self.env.timestamp;
        }
        self.emit(
            UPGRADED,
            &[
                Token::Address(proxy),
                Token::Address(record.logic),
                Token::Address(new_logic),
                Token::Address(record.owner),
                Token::word(record.type_id),
                Token::bytes2(version),
                Token::word(salt),
            ],
        )
    }
}

fn type_tuple(id: Hash, entry: Option<&TypeEntry>) -> Vec<Token> {
    match entry {
        Some(entry) => vec![
            Token::word(id),
            Token::String(entry.name.clone()),
            Token::bytes2(entry.version),
        ],
        None => vec![
            Token::word(Hash::ZERO),
            Token::String(String::new()),
            Token::bytes2(0),
        ],
    }
}

fn arg<'a>(args: &'a [Token], position: usize) -> Result<&'a Token, String> {
    args.get(position)
        .ok_or_else(|| format!("missing argument {position}"))
}

fn string_arg(args: &[Token], position: usize) -> Result<String, String> {
    arg(args, position)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("argument {position} is not a string"))
}

fn bytes_arg(args: &[Token], position: usize) -> Result<Vec<u8>, String> {
    match arg(args, position)? {
        Token::Bytes(bytes) => Ok(bytes.clone()),
        _ => Err(format!("argument {position} is not bytes")),
    }
}

fn hash_arg(args: &[Token], position: usize) -> Result<Hash, String> {
    arg(args, position)?
        .as_hash()
        .ok_or_else(|| format!("argument {position} is not bytes32"))
}

fn bytes2_arg(args: &[Token], position: usize) -> Result<u16, String> {
    arg(args, position)?
        .as_bytes2()
        .ok_or_else(|| format!("argument {position} is not bytes2"))
}

fn address_arg(args: &[Token], position: usize) -> Result<Address, String> {
    arg(args, position)?
        .as_address()
        .ok_or_else(|| format!("argument {position} is not an address"))
}

/// Route call data to an operation and decode its arguments.
fn route(data: &[u8]) -> Result<(&'static str, Vec<Token>), String> {
    let selector = data.get(..4).ok_or("call data shorter than a selector")?;
    let capability = REGISTRY_ABI
        .by_selector(selector)
        .ok_or("unknown selector")?;
    let args = abi::decode(&capability.params, &data[4..]).map_err(|e| e.to_string())?;
    let name = [
        SET_TYPE,
        SET_VERSION,
        DEPLOY_CONTRACT,
        UPGRADE_CONTRACT,
        GET_TYPE_BY_NAME,
        GET_TYPE,
        GET_RECORD,
    ]
    .into_iter()
    .find(|name| *name == capability.name)
    .ok_or("unrouted operation")?;
    Ok((name, args))
}

impl ContractEmulator for RegistryEmulator {
    fn execute(&self, env: &CallEnv, data: &[u8]) -> Result<Vec<EmittedLog>, String> {
        let (operation, args) = route(data)?;
        let mut state = self.state.lock();
        let mut execution = Execution {
            env,
            state: &mut *state,
            logs: Vec::new(),
        };

        match operation {
            SET_TYPE => execution.set_type(&args)?,
            SET_VERSION => execution.set_version(&args)?,
            DEPLOY_CONTRACT => execution.deploy(&args)?,
            UPGRADE_CONTRACT => execution.upgrade(&args)?,
            other => return Err(format!("{other} is read-only")),
        }
        debug!(operation, logs = execution.logs.len(), "[lo-02] Registry emulator executed");
        Ok(execution.logs)
    }

    fn call(&self, _env: &CallEnv, data: &[u8]) -> Result<Vec<u8>, String> {
        let (operation, args) = route(data)?;
        let state = self.state.lock();

        let output = match operation {
            GET_TYPE_BY_NAME => {
                let id = type_id_for(&string_arg(&args, 0)?);
                type_tuple(id, state.types.get(&id))
            }
            GET_TYPE => {
                let id = hash_arg(&args, 0)?;
                type_tuple(id, state.types.get(&id))
            }
            GET_RECORD => {
                let proxy = address_arg(&args, 0)?;
                match state.records.get(&proxy) {
                    Some(record) => vec![
                        Token::Address(proxy),
                        Token::Address(record.logic),
                        Token::Address(record.owner),
                        Token::word(record.type_id),
                        Token::bytes2(record.version),
                        Token::Uint(U256::from(record.created)),
                        Token::Uint(U256::from(record.updated)),
                    ],
                    None => vec![
                        Token::Address(Address::ZERO),
                        Token::Address(Address::ZERO),
                        Token::Address(Address::ZERO),
                        Token::word(Hash::ZERO),
                        Token::bytes2(0),
                        Token::Uint(U256::zero()),
                        Token::Uint(U256::zero()),
                    ],
                }
            }
            other => return Err(format!("{other} is not a view")),
        };
        Ok(abi::encode(&output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(sender: Address) -> CallEnv {
        CallEnv {
            contract: Address([0x5E; 20]),
            sender,
            block_number: 1,
            timestamp: 1_700_000_001,
            transaction_hash: Hash::ZERO,
        }
    }

    fn call_data(operation: &str, args: &[Token]) -> Vec<u8> {
        REGISTRY_ABI
            .function(operation)
            .unwrap()
            .encode_call(args)
            .unwrap()
    }

    fn register(emulator: &RegistryEmulator, name: &str) {
        emulator
            .execute(
                &env(Address([1; 20])),
                &call_data(SET_TYPE, &[Token::from(name), Token::bytes2(1)]),
            )
            .unwrap();
    }

    fn deploy(emulator: &RegistryEmulator, salt: u8) -> Result<Vec<EmittedLog>, String> {
        emulator.execute(
            &env(Address([1; 20])),
            &call_data(
                DEPLOY_CONTRACT,
                &[
                    Token::Bytes(vec![0x60, 0x80]),
                    Token::Bytes(vec![]),
                    Token::word(Hash([salt; 32])),
                    Token::word(type_id_for("example")),
                ],
            ),
        )
    }

    #[test]
    fn test_deploy_emits_distinct_addresses() {
        let emulator = RegistryEmulator::new();
        register(&emulator, "example");

        let logs = deploy(&emulator, 7).unwrap();
        assert_eq!(logs.len(), 1);
        let proxy = Address::from_word(&logs[0].topics[1].0);
        let logic = Address::from_word(&logs[0].topics[2].0);
        assert_ne!(proxy, logic);
        assert_eq!(emulator.proxies(), vec![proxy]);
    }

    #[test]
    fn test_reused_salt_collides() {
        let emulator = RegistryEmulator::new();
        register(&emulator, "example");
        deploy(&emulator, 7).unwrap();
        assert!(deploy(&emulator, 7).unwrap_err().contains("collision"));
        assert!(deploy(&emulator, 8).is_ok());
    }

    #[test]
    fn test_unregistered_type_reverts() {
        let emulator = RegistryEmulator::new();
        assert!(deploy(&emulator, 1).unwrap_err().contains("not registered"));
    }

    #[test]
    fn test_collapse_fault() {
        let emulator = RegistryEmulator::new();
        register(&emulator, "example");
        emulator.set_collapse_addresses(true);
        let logs = deploy(&emulator, 3).unwrap();
        assert_eq!(logs[0].topics[1], logs[0].topics[2]);
    }

    #[test]
    fn test_duplicate_type_reverts() {
        let emulator = RegistryEmulator::new();
        register(&emulator, "example");
        let again = emulator.execute(
            &env(Address([1; 20])),
            &call_data(SET_TYPE, &[Token::from("example"), Token::bytes2(1)]),
        );
        assert!(again.is_err());
        assert_eq!(emulator.type_count(), 1);
    }

    #[test]
    fn test_views_report_absence_as_zero() {
        let emulator = RegistryEmulator::new();
        let output = emulator
            .call(
                &env(Address::ZERO),
                &call_data(GET_TYPE_BY_NAME, &[Token::from("missing")]),
            )
            .unwrap();
        let capability = REGISTRY_ABI.function(GET_TYPE_BY_NAME).unwrap();
        let tokens = capability.decode_output(&output).unwrap();
        assert_eq!(tokens[0].as_hash(), Some(Hash::ZERO));
    }
}
