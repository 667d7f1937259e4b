//! # Domain Entities
//!
//! Component types and registry records as stored by the on-chain registry.

use super::value_objects::{type_id_for, Version};
use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash, Receipt};

/// A catalogued component type.
///
/// `type_id` is always the hash of `name`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentType {
    /// Hash of the name.
    pub type_id: Hash,
    /// Human-readable label.
    pub name: String,
    /// Current version tag.
    pub version: Version,
}

impl ComponentType {
    /// Type with the identifier derived from its name.
    pub fn new(name: &str, version: Version) -> Self {
        Self {
            type_id: type_id_for(name),
            name: name.to_string(),
            version,
        }
    }
}

/// A deployed component as the registry records it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    /// Stable address of the component.
    pub proxy: Address,
    /// Current executable payload behind the proxy.
    pub logic: Address,
    /// Controlling account.
    pub owner: Address,
    /// Type of the component.
    pub type_id: Hash,
    /// Type version at deploy or last upgrade.
    pub version: Version,
    /// Creation time (seconds).
    pub date_created: u64,
    /// Last upgrade time (seconds).
    pub date_updated: u64,
}

impl RegistryRecord {
    /// Whether proxy and logic are distinct addresses.
    pub fn has_distinct_addresses(&self) -> bool {
        self.proxy != self.logic
    }
}

/// Outcome of a type registration.
#[derive(Clone, Debug)]
pub enum Registration {
    /// A new type was created and its `NewType` event confirmed.
    Registered {
        /// The created type
        component_type: ComponentType,
        /// Receipt of the registration
        receipt: Receipt,
    },
    /// The name already existed with a compatible version; nothing sent.
    AlreadyRegistered(ComponentType),
}

impl Registration {
    /// The registered type, new or existing.
    pub fn component_type(&self) -> &ComponentType {
        match self {
            Self::Registered { component_type, .. } => component_type,
            Self::AlreadyRegistered(component_type) => component_type,
        }
    }

    /// Whether a transaction was sent.
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Registered { .. })
    }
}
