//! # Inbound Ports
//!
//! API exposed by the Type Registry.

use crate::domain::{ComponentType, Registration, RegistryError, RegistryRecord};
use async_trait::async_trait;
use shared_types::{Address, Hash, Receipt};

/// Type Registry API - inbound port.
#[async_trait]
pub trait TypeRegistryApi: Send + Sync {
    /// Address of the on-chain registry.
    fn address(&self) -> Address;

    /// Register a type; idempotent for an identical or unspecified version.
    async fn register_type(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Registration, RegistryError>;

    /// Resolve a type by name or `0x` identifier.
    async fn resolve_type(&self, name_or_id: &str) -> Result<ComponentType, RegistryError>;

    /// Replace a type's version.
    async fn update_version(
        &self,
        type_id: Hash,
        new_version: &str,
    ) -> Result<Receipt, RegistryError>;

    /// Registry record of a deployed component.
    async fn record(&self, proxy: Address) -> Result<RegistryRecord, RegistryError>;

    /// Existing type by name, or a freshly registered one at the default version.
    async fn resolve_or_register(&self, name: &str) -> Result<ComponentType, RegistryError> {
        Ok(self.register_type(name, None).await?.component_type().clone())
    }
}
