//! # Domain Entities
//!
//! Requests, outcomes and the in-flight state of a deployment.

use crate::domain::DeploymentRun;
use lo_02_type_registry::{ComponentType, RegistryRecord};
use lo_04_compensation::{CompensationAction, WorkflowContext};
use shared_types::{Address, Bytes, Hash, Receipt, UnsignedTransaction};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A fresh deployment through the registry.
#[derive(Clone)]
pub struct DeployRequest {
    /// Artifact reference, for logs.
    pub artifact: String,
    /// Logic creation bytecode.
    pub bytecode: Bytes,
    /// Encoded initializer call, empty when the contract has none.
    pub init_data: Bytes,
    /// Account that will own the proxy.
    pub account: Address,
    /// Component type name.
    pub type_name: String,
    /// Inverse recorded once the deployment is registered.
    pub compensation: Option<Arc<dyn CompensationAction>>,
}

impl DeployRequest {
    /// Request with no initializer and no compensation.
    pub fn new(
        artifact: impl Into<String>,
        bytecode: impl Into<Bytes>,
        account: Address,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            artifact: artifact.into(),
            bytecode: bytecode.into(),
            init_data: Bytes::default(),
            account,
            type_name: type_name.into(),
            compensation: None,
        }
    }

    /// Set the encoded initializer call.
    #[must_use]
    pub fn with_init_data(mut self, init_data: impl Into<Bytes>) -> Self {
        self.init_data = init_data.into();
        self
    }

    /// Set the inverse recorded after registration.
    #[must_use]
    pub fn with_compensation(mut self, action: Arc<dyn CompensationAction>) -> Self {
        self.compensation = Some(action);
        self
    }
}

impl fmt::Debug for DeployRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployRequest")
            .field("artifact", &self.artifact)
            .field("bytecode_len", &self.bytecode.len())
            .field("init_data_len", &self.init_data.len())
            .field("account", &self.account)
            .field("type_name", &self.type_name)
            .field("compensation", &self.compensation.as_ref().map(|a| a.describe()))
            .finish()
    }
}

/// New logic behind an existing proxy.
#[derive(Clone, Debug)]
pub struct UpgradeRequest {
    /// Artifact reference, for logs.
    pub artifact: String,
    /// Proxy being upgraded.
    pub proxy: Address,
    /// New logic creation bytecode.
    pub bytecode: Bytes,
    /// Proxy owner.
    pub account: Address,
}

impl UpgradeRequest {
    /// Upgrade request.
    pub fn new(
        artifact: impl Into<String>,
        proxy: Address,
        bytecode: impl Into<Bytes>,
        account: Address,
    ) -> Self {
        Self {
            artifact: artifact.into(),
            proxy,
            bytecode: bytecode.into(),
            account,
        }
    }
}

/// Result of starting a deployment or upgrade.
#[derive(Clone, Debug)]
pub enum DeploymentOutcome {
    /// Confirmed and registered.
    Completed {
        /// Workflow id
        workflow_id: Uuid,
        /// Registry record of the proxy
        record: RegistryRecord,
    },
    /// Paused until the caller submits the signed payload.
    AwaitingSignature {
        /// Workflow id
        workflow_id: Uuid,
        /// Transaction to sign
        transaction: UnsignedTransaction,
    },
}

impl DeploymentOutcome {
    /// Workflow id.
    pub fn workflow_id(&self) -> Uuid {
        match self {
            Self::Completed { workflow_id, .. } | Self::AwaitingSignature { workflow_id, .. } => {
                *workflow_id
            }
        }
    }

    /// Record, when completed.
    pub fn record(&self) -> Option<&RegistryRecord> {
        match self {
            Self::Completed { record, .. } => Some(record),
            Self::AwaitingSignature { .. } => None,
        }
    }

    /// Unsigned transaction, when paused.
    pub fn unsigned(&self) -> Option<&UnsignedTransaction> {
        match self {
            Self::AwaitingSignature { transaction, .. } => Some(transaction),
            Self::Completed { .. } => None,
        }
    }
}

/// Result of a deployment run inside a caller-owned workflow context.
#[derive(Debug)]
pub enum Progress {
    /// Registered; the context now holds this run's compensation, if any.
    Completed {
        /// Registry record of the proxy
        record: RegistryRecord,
        /// Context to continue with
        context: WorkflowContext,
    },
    /// Paused; the context travels with the paused workflow.
    AwaitingSignature {
        /// Workflow id
        workflow_id: Uuid,
        /// Transaction to sign
        transaction: UnsignedTransaction,
    },
}

/// Result of forwarding a signed payload.
#[derive(Clone, Debug)]
pub enum ResumeOutcome {
    /// A paused workflow completed.
    Completed {
        /// Workflow id
        workflow_id: Uuid,
        /// Registry record of the proxy
        record: RegistryRecord,
    },
    /// No workflow was waiting on this transaction.
    Untracked(Receipt),
}

/// What verification looks for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Correlation {
    /// `Deployed` for this type.
    Deploy {
        /// Type being deployed
        component_type: ComponentType,
    },
    /// `Upgraded` for this proxy.
    Upgrade {
        /// Proxy being upgraded
        proxy: Address,
        /// Logic before the upgrade
        previous_logic: Address,
    },
}

/// A deployment whose transaction has been prepared or sent.
pub struct InFlight {
    /// State machine.
    pub run: DeploymentRun,
    /// Workflow context the run belongs to.
    pub context: WorkflowContext,
    /// Signing account.
    pub account: Address,
    /// Salt sent with the call.
    pub salt: Hash,
    /// Event correlation target.
    pub correlation: Correlation,
    /// Inverse to record after registration.
    pub compensation: Option<Arc<dyn CompensationAction>>,
}

impl fmt::Debug for InFlight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InFlight")
            .field("workflow_id", &self.run.workflow_id())
            .field("state", &self.run.state())
            .field("account", &self.account)
            .field("salt", &self.salt)
            .field("correlation", &self.correlation)
            .finish()
    }
}
