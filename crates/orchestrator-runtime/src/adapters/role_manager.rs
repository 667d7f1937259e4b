//! In-memory role manager contract.
//!
//! Executes `addAdmin`/`removeAdmin`/`isAdmin` for [`InMemoryLedger`] and
//! emits the same events as the deployed role manager. Only admins may
//! change the admin set.
//!
//! Fault switches:
//! - `set_suppress_events`: operations succeed without emitting events
//!
//! [`InMemoryLedger`]: lo_01_ledger_client::InMemoryLedger

use crate::workflows::roles::{
    ADD_ADMIN, ADMIN_ADDED, ADMIN_REMOVED, IS_ADMIN, REMOVE_ADMIN, ROLE_MANAGER_ABI,
};
use lo_01_ledger_client::{CallEnv, ContractEmulator, EmittedLog};
use parking_lot::Mutex;
use shared_types::{abi, Address, Token};
use std::collections::HashSet;
use tracing::debug;

#[derive(Default)]
struct RoleState {
    admins: HashSet<Address>,
    suppress_events: bool,
}

/// Role manager emulator.
#[derive(Default)]
pub struct RoleManagerEmulator {
    state: Mutex<RoleState>,
}

impl RoleManagerEmulator {
    /// Role manager whose only admin is `initial_admin`.
    pub fn new(initial_admin: Address) -> Self {
        let emulator = Self::default();
        emulator.state.lock().admins.insert(initial_admin);
        emulator
    }

    /// Succeed without emitting events.
    pub fn set_suppress_events(&self, suppress: bool) {
        self.state.lock().suppress_events = suppress;
    }

    /// Whether `account` holds the admin role.
    pub fn is_admin(&self, account: Address) -> bool {
        self.state.lock().admins.contains(&account)
    }

    /// Number of admins.
    pub fn admin_count(&self) -> usize {
        self.state.lock().admins.len()
    }
}

fn route(data: &[u8]) -> Result<(&'static str, Address), String> {
    let selector = data.get(..4).ok_or("call data shorter than a selector")?;
    let capability = ROLE_MANAGER_ABI
        .by_selector(selector)
        .ok_or("unknown selector")?;
    let args = abi::decode(&capability.params, &data[4..]).map_err(|e| e.to_string())?;
    let account = args
        .first()
        .and_then(Token::as_address)
        .ok_or("argument 0 is not an address")?;
    let name = [ADD_ADMIN, REMOVE_ADMIN, IS_ADMIN]
        .into_iter()
        .find(|name| *name == capability.name)
        .ok_or("unrouted operation")?;
    Ok((name, account))
}

impl ContractEmulator for RoleManagerEmulator {
    fn execute(&self, env: &CallEnv, data: &[u8]) -> Result<Vec<EmittedLog>, String> {
        let (operation, account) = route(data)?;
        let mut state = self.state.lock();
        if !state.admins.contains(&env.sender) {
            return Err("caller is not an admin".into());
        }

        let event = match operation {
            ADD_ADMIN => {
                if !state.admins.insert(account) {
                    return Err(format!("{account} is already an admin"));
                }
                ADMIN_ADDED
            }
            REMOVE_ADMIN => {
                if account == env.sender {
                    return Err("admins cannot remove themselves".into());
                }
                if !state.admins.remove(&account) {
                    return Err(format!("{account} is not an admin"));
                }
                ADMIN_REMOVED
            }
            other => return Err(format!("{other} is read-only")),
        };
        debug!(operation, account = %account, "[runtime] Role manager emulator executed");

        if state.suppress_events {
            return Ok(Vec::new());
        }
        let descriptor = ROLE_MANAGER_ABI.event(event).map_err(|e| e.to_string())?;
        let (topics, data) = descriptor
            .encode_log(&[Token::Address(account), Token::Address(env.sender)])
            .map_err(|e| e.to_string())?;
        Ok(vec![EmittedLog {
            address: env.contract,
            topics,
            data,
        }])
    }

    fn call(&self, _env: &CallEnv, data: &[u8]) -> Result<Vec<u8>, String> {
        match route(data)? {
            (IS_ADMIN, account) => Ok(abi::encode(&[Token::Bool(self.is_admin(account))])),
            (other, _) => Err(format!("{other} is not a view")),
        }
    }
}
