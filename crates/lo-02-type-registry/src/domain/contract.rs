//! # Registry Contract Surface
//!
//! The registry's operations and events, built once.
//!
//! | Operation | Mutability | Parameters |
//! |-----------|------------|------------|
//! | `setType` | mutating | `(string name, bytes2 version)` |
//! | `setVersion` | mutating | `(bytes32 id, bytes2 version)` |
//! | `deployContract` | mutating | `(bytes code, bytes initData, bytes32 salt, bytes32 typeId)` |
//! | `upgradeContract` | mutating | `(address proxy, bytes code, bytes32 salt)` |
//! | `getTypeByName` | view | `(string name)` |
//! | `getType` | view | `(bytes32 id)` |
//! | `getRecord` | view | `(address proxy)` |

use shared_types::{Capability, CapabilityTable, EventDescriptor, Mutability, ParamKind};
use std::sync::LazyLock;

/// `setType(string,bytes2)`
pub const SET_TYPE: &str = "setType";
/// `setVersion(bytes32,bytes2)`
pub const SET_VERSION: &str = "setVersion";
/// `deployContract(bytes,bytes,bytes32,bytes32)`
pub const DEPLOY_CONTRACT: &str = "deployContract";
/// `upgradeContract(address,bytes,bytes32)`
pub const UPGRADE_CONTRACT: &str = "upgradeContract";
/// `getTypeByName(string)`
pub const GET_TYPE_BY_NAME: &str = "getTypeByName";
/// `getType(bytes32)`
pub const GET_TYPE: &str = "getType";
/// `getRecord(address)`
pub const GET_RECORD: &str = "getRecord";

/// `NewType(bytes32 indexed id, string name, bytes2 version)`
pub const NEW_TYPE: &str = "NewType";
/// `VersionUpdated(bytes32 indexed id, bytes2 oldVersion, bytes2 newVersion)`
pub const VERSION_UPDATED: &str = "VersionUpdated";
/// `Deployed(address indexed proxy, address indexed logic, address indexed owner, bytes32 type_, bytes32 salt)`
pub const DEPLOYED: &str = "Deployed";
/// `Upgraded(address indexed proxy, address indexed oldLogic, address indexed newLogic, address owner, bytes32 type_, bytes2 version, bytes32 salt)`
pub const UPGRADED: &str = "Upgraded";

/// Output shape of `getType`/`getTypeByName`: `(id, name, version)`.
const TYPE_OUTPUT: [ParamKind; 3] = [ParamKind::BYTES32, ParamKind::String, ParamKind::BYTES2];

/// The registry's capability table.
pub static REGISTRY_ABI: LazyLock<CapabilityTable> = LazyLock::new(|| {
    use Mutability::{Mutating, View};
    use ParamKind::{Address, Bytes, String, Uint};
    const B32: ParamKind = ParamKind::BYTES32;
    const B2: ParamKind = ParamKind::BYTES2;

    CapabilityTable::new()
        .with_function(Capability::new(SET_TYPE, vec![String, B2], vec![], Mutating))
        .with_function(Capability::new(SET_VERSION, vec![B32, B2], vec![], Mutating))
        .with_function(Capability::new(
            DEPLOY_CONTRACT,
            vec![Bytes, Bytes, B32, B32],
            vec![Address],
            Mutating,
        ))
        .with_function(Capability::new(
            UPGRADE_CONTRACT,
            vec![Address, Bytes, B32],
            vec![Address],
            Mutating,
        ))
        .with_function(Capability::new(
            GET_TYPE_BY_NAME,
            vec![String],
            TYPE_OUTPUT.to_vec(),
            View,
        ))
        .with_function(Capability::new(GET_TYPE, vec![B32], TYPE_OUTPUT.to_vec(), View))
        .with_function(Capability::new(
            GET_RECORD,
            vec![Address],
            vec![Address, Address, Address, B32, B2, Uint, Uint],
            View,
        ))
        .with_event(
            EventDescriptor::new(NEW_TYPE)
                .indexed("id", B32)
                .param("name", String)
                .param("version", B2),
        )
        .with_event(
            EventDescriptor::new(VERSION_UPDATED)
                .indexed("id", B32)
                .param("oldVersion", B2)
                .param("newVersion", B2),
        )
        .with_event(
            EventDescriptor::new(DEPLOYED)
                .indexed("proxy", Address)
                .indexed("logic", Address)
                .indexed("owner", Address)
                .param("type_", B32)
                .param("salt", B32),
        )
        .with_event(
            EventDescriptor::new(UPGRADED)
                .indexed("proxy", Address)
                .indexed("oldLogic", Address)
                .indexed("newLogic", Address)
                .param("owner", Address)
                .param("type_", B32)
                .param("version", B2)
                .param("salt", B32),
        )
});
