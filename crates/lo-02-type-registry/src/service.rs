//! # Type Registry Service
//!
//! Drives the on-chain registry through the ledger session. Every mutating
//! registry call is sent from the operator account, waited on, and then
//! confirmed by finding its event in the receipt's block.
//!
//! ## Idempotence
//!
//! `register_type(name, version)` reads the registry first:
//!
//! | On ledger | Requested | Outcome |
//! |-----------|-----------|---------|
//! | absent | any | `setType`, confirm `NewType` |
//! | present | none | `AlreadyRegistered` |
//! | present | same version | `AlreadyRegistered` |
//! | present | other version | `TypeConflict` |
//!
//! Registrations of one name are serialized, so concurrent first deploys
//! of a new type send a single `setType`. A `setType` that still reverts
//! (another writer got there first) is settled from what the ledger holds.

use crate::domain::contract::{
    GET_RECORD, GET_TYPE, GET_TYPE_BY_NAME, NEW_TYPE, SET_TYPE, SET_VERSION, VERSION_UPDATED,
};
use crate::domain::{
    ComponentType, Registration, RegistryError, RegistryRecord, TypeRef, Version, REGISTRY_ABI,
};
use crate::ports::TypeRegistryApi;
use async_trait::async_trait;
use dashmap::DashMap;
use lo_01_ledger_client::LedgerSession;
use shared_types::{
    AbiError, Address, ArgFilter, ContractCall, DecodedEvent, Hash, Receipt, Token,
};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// On-chain Type Registry client.
pub struct TypeRegistry {
    session: Arc<LedgerSession>,
    address: Address,
    operator: Address,
    /// One gate per type name held across read, `setType` and confirmation.
    registrations: DashMap<String, Arc<Mutex<()>>>,
}

impl TypeRegistry {
    /// Registry at `address`, written to from the managed `operator` account.
    pub fn new(session: Arc<LedgerSession>, address: Address, operator: Address) -> Self {
        info!(registry = %address, operator = %operator, "[lo-02] Type registry bound");
        Self {
            session,
            address,
            operator,
            registrations: DashMap::new(),
        }
    }

    /// Account that sends registry transactions.
    pub fn operator(&self) -> Address {
        self.operator
    }

    /// Look a type up without failing when it is absent.
    pub async fn find_type(&self, type_ref: &TypeRef) -> Result<Option<ComponentType>, RegistryError> {
        let output = match type_ref {
            TypeRef::Name(name) => self.view(GET_TYPE_BY_NAME, &[Token::from(name.as_str())]).await?,
            TypeRef::Id(id) => self.view(GET_TYPE, &[Token::word(*id)]).await?,
        };
        decode_type(&output)
    }

    /// Register several types in order.
    ///
    /// `versions` is empty (default for all), a single version for all, or
    /// one version per name.
    #[instrument(skip(self), fields(registry = %self.address))]
    pub async fn register_types(
        &self,
        names: &[&str],
        versions: &[&str],
    ) -> Result<Vec<Registration>, RegistryError> {
        let versions: Vec<Option<&str>> = match versions.len() {
            0 => vec![None; names.len()],
            1 => vec![Some(versions[0]); names.len()],
            n if n == names.len() => versions.iter().copied().map(Some).collect(),
            n => {
                return Err(RegistryError::BatchShape {
                    names: names.len(),
                    versions: n,
                })
            }
        };

        let mut registrations = Vec::with_capacity(names.len());
        for (name, version) in names.iter().zip(versions) {
            registrations.push(self.register_type(name, version).await?);
        }
        Ok(registrations)
    }

    fn registration_gate(&self, name: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.registrations.entry(name.to_string()).or_default().value())
    }

    async fn view(&self, operation: &str, args: &[Token]) -> Result<Vec<Token>, RegistryError> {
        let capability = REGISTRY_ABI.function(operation)?;
        let output = self
            .session
            .call(self.address, &capability.encode_call(args)?)
            .await?;
        Ok(capability.decode_output(&output)?)
    }

    async fn transact(
        &self,
        operation: &'static str,
        args: &[Token],
    ) -> Result<Receipt, RegistryError> {
        let capability = REGISTRY_ABI.function(operation)?;
        let call = ContractCall::new(self.address, capability.encode_call(args)?);

        let lease = self.session.lease_nonce(self.operator).await?;
        let handle = self
            .session
            .submit_managed(lease, &call, self.session.fees())
            .await?;
        let receipt = self.session.wait_for_confirmation(handle.hash).await?;

        if !receipt.succeeded() {
            return Err(RegistryError::Reverted {
                operation,
                tx_hash: receipt.transaction_hash,
            });
        }
        debug!(operation, tx_hash = %receipt.transaction_hash, block = receipt.block_number, "[lo-02] Registry transaction confirmed");
        Ok(receipt)
    }

    /// Find the event a confirmed registry transaction must have emitted.
    async fn confirm_event(
        &self,
        operation: &'static str,
        event: &'static str,
        filter: &ArgFilter,
        receipt: &Receipt,
    ) -> Result<DecodedEvent, RegistryError> {
        let descriptor = REGISTRY_ABI.event(event)?;
        let events = self
            .session
            .query_events(
                self.address,
                descriptor,
                filter,
                receipt.block_number,
                receipt.block_number,
            )
            .await?;

        events
            .into_iter()
            .find(|e| e.transaction_hash == receipt.transaction_hash)
            .ok_or(RegistryError::EventMissing {
                operation,
                event,
                tx_hash: receipt.transaction_hash,
            })
    }
}

#[async_trait]
impl TypeRegistryApi for TypeRegistry {
    fn address(&self) -> Address {
        self.address
    }

    #[instrument(skip(self), fields(registry = %self.address))]
    async fn register_type(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Registration, RegistryError> {
        let requested = version.map(Version::from_str).transpose()?;
        let gate = self.registration_gate(name);
        let _registering = gate.lock().await;

        if let Some(existing) = self.find_type(&TypeRef::Name(name.to_string())).await? {
            return settle_existing(name, existing, requested);
        }

        let component_type = ComponentType::new(name, requested.unwrap_or_default());
        let sent = self
            .transact(
                SET_TYPE,
                &[
                    Token::from(name),
                    Token::bytes2(component_type.version.packed()),
                ],
            )
            .await;
        let receipt = match sent {
            Ok(receipt) => receipt,
            Err(RegistryError::Reverted { operation, tx_hash }) => {
                let Some(existing) = self.find_type(&TypeRef::Name(name.to_string())).await? else {
                    return Err(RegistryError::Reverted { operation, tx_hash });
                };
                warn!(name, tx_hash = %tx_hash, "[lo-02] setType reverted, type registered elsewhere");
                return settle_existing(name, existing, requested);
            }
            Err(err) => return Err(err),
        };
        self.confirm_event(
            SET_TYPE,
            NEW_TYPE,
            &ArgFilter::any().exact(component_type.type_id),
            &receipt,
        )
        .await?;

        info!(
            name,
            type_id = %component_type.type_id,
            version = %component_type.version,
            "[lo-02] Type registered"
        );
        Ok(Registration::Registered {
            component_type,
            receipt,
        })
    }

    async fn resolve_type(&self, name_or_id: &str) -> Result<ComponentType, RegistryError> {
        let type_ref = TypeRef::parse(name_or_id)?;
        self.find_type(&type_ref)
            .await?
            .ok_or_else(|| RegistryError::TypeNotFound(type_ref.to_string()))
    }

    #[instrument(skip(self), fields(registry = %self.address))]
    async fn update_version(
        &self,
        type_id: Hash,
        new_version: &str,
    ) -> Result<Receipt, RegistryError> {
        let requested: Version = new_version.parse()?;
        let current = self
            .find_type(&TypeRef::Id(type_id))
            .await?
            .ok_or_else(|| RegistryError::TypeNotFound(type_id.to_string()))?;

        if requested <= current.version {
            return Err(RegistryError::VersionNotNewer {
                current: current.version,
                requested,
            });
        }

        let receipt = self
            .transact(
                SET_VERSION,
                &[Token::word(type_id), Token::bytes2(requested.packed())],
            )
            .await?;
        self.confirm_event(
            SET_VERSION,
            VERSION_UPDATED,
            &ArgFilter::any().exact(type_id),
            &receipt,
        )
        .await?;

        info!(
            name = %current.name,
            from = %current.version,
            to = %requested,
            "[lo-02] Type version updated"
        );
        Ok(receipt)
    }

    async fn record(&self, proxy: Address) -> Result<RegistryRecord, RegistryError> {
        let output = self.view(GET_RECORD, &[Token::Address(proxy)]).await?;
        let record = RegistryRecord {
            proxy: field(&output, 0, Token::as_address)?,
            logic: field(&output, 1, Token::as_address)?,
            owner: field(&output, 2, Token::as_address)?,
            type_id: field(&output, 3, Token::as_hash)?,
            version: Version::from_packed(field(&output, 4, Token::as_bytes2)?),
            date_created: field(&output, 5, Token::as_uint)?.low_u64(),
            date_updated: field(&output, 6, Token::as_uint)?.low_u64(),
        };
        if record.proxy.is_zero() {
            return Err(RegistryError::RecordNotFound(proxy));
        }
        Ok(record)
    }
}

/// Outcome of registering `name` when the ledger already holds `existing`.
fn settle_existing(
    name: &str,
    existing: ComponentType,
    requested: Option<Version>,
) -> Result<Registration, RegistryError> {
    match requested {
        Some(requested) if requested != existing.version => Err(RegistryError::TypeConflict {
            name: name.to_string(),
            registered: existing.version,
            requested,
        }),
        _ => {
            debug!(name, version = %existing.version, "[lo-02] Type already registered");
            Ok(Registration::AlreadyRegistered(existing))
        }
    }
}

/// Decode a `(id, name, version)` tuple; a zero id means absent.
fn decode_type(output: &[Token]) -> Result<Option<ComponentType>, RegistryError> {
    let type_id = field(output, 0, Token::as_hash)?;
    if type_id.is_zero() {
        return Ok(None);
    }
    let name = field(output, 1, |t| t.as_str().map(str::to_string))?;
    let version = Version::from_packed(field(output, 2, Token::as_bytes2)?);
    Ok(Some(ComponentType {
        type_id,
        name,
        version,
    }))
}

fn field<T>(
    output: &[Token],
    position: usize,
    extract: impl Fn(&Token) -> Option<T>,
) -> Result<T, AbiError> {
    let token = output.get(position).ok_or(AbiError::ArityMismatch {
        expected: position + 1,
        got: output.len(),
    })?;
    extract(token).ok_or_else(|| AbiError::KindMismatch {
        position,
        expected: "registry output".into(),
        got: token.kind().to_string(),
    })
}
