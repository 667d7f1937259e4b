//! # Admin Workflows
//!
//! Grant and revoke the admin role on the role manager, keeping the local
//! `admins` collection in step with the ledger.
//!
//! ## Adding an admin
//!
//! 1. The sender must hold an admin record; username and account must be free.
//! 2. `addAdmin(account)` is sent from the sender, which must be a managed
//!    account.
//! 3. Once accepted by the ledger, `removeAdmin(account)` is recorded as
//!    the inverse, even when confirmation timed out.
//! 4. `AdminAdded(account, sender)` from this transaction must appear in the
//!    receipt's block. Without a receipt, blocks from submission to head
//!    are searched for it instead.
//! 5. The admin record is saved and its deletion recorded as the inverse.
//!
//! Any failure after step 3 replays the recorded inverses.
//!
//! Removal mirrors this with `removeAdmin`, `AdminRemoved` and a re-grant
//! as the inverse.

use crate::workflows::roles::{ADD_ADMIN, ADMIN_ADDED, ADMIN_REMOVED, REMOVE_ADMIN, ROLE_MANAGER_ABI};
use crate::workflows::{WorkflowError, WorkflowResponse};
use lo_01_ledger_client::{LedgerError, LedgerSession};
use lo_03_signer_dispatch::{DispatchError, DispatchOutcome, SignerDecision, SignerDispatchApi};
use lo_04_compensation::{
    CommittedStep, CompensationManager, DeleteDocumentAction, DocumentStore, LedgerCallAction,
    StoreError, WorkflowContext,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_types::{Address, ArgFilter, ContractCall, Receipt, Token, TransactionHandle};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Collection holding admin records, keyed by username.
pub const ADMINS: &str = "admins";

/// A stored admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRecord {
    /// Unique username.
    pub username: String,
    /// Ledger account holding the role.
    pub account: Address,
    /// Admin that granted the role; absent for the reference admin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<Address>,
}

impl AdminRecord {
    fn from_document(document: Value) -> Result<Self, WorkflowError> {
        serde_json::from_value(document)
            .map_err(|e| StoreError::Serialization(e.to_string()).into())
    }

    fn to_document(&self) -> Result<Value, WorkflowError> {
        serde_json::to_value(self).map_err(|e| StoreError::Serialization(e.to_string()).into())
    }
}

/// A role transaction the ledger accepted.
#[derive(Debug)]
enum Landing {
    /// Mined, with its receipt.
    Mined(Receipt),
    /// Accepted but not confirmed; it may still be included.
    Unconfirmed {
        handle: TransactionHandle,
        submitted_at_block: u64,
        source: LedgerError,
    },
}

/// Admin role workflows.
pub struct AdminWorkflows {
    session: Arc<LedgerSession>,
    dispatcher: Arc<dyn SignerDispatchApi>,
    store: Arc<dyn DocumentStore>,
    compensation: Arc<CompensationManager>,
    role_manager: Address,
}

impl AdminWorkflows {
    /// Workflows against the role manager at `role_manager`.
    pub fn new(
        session: Arc<LedgerSession>,
        dispatcher: Arc<dyn SignerDispatchApi>,
        store: Arc<dyn DocumentStore>,
        compensation: Arc<CompensationManager>,
        role_manager: Address,
    ) -> Self {
        Self {
            session,
            dispatcher,
            store,
            compensation,
            role_manager,
        }
    }

    /// Make sure the reference admin has a record.
    ///
    /// An existing record for `account` is kept under its own username.
    pub async fn bootstrap(&self, username: &str, account: Address) -> Result<AdminRecord, WorkflowError> {
        if let Some(existing) = self.by_account(account).await? {
            info!(username = %existing.username, account = %account, "[runtime] Keeping reference admin");
            return Ok(existing);
        }
        let record = AdminRecord {
            username: username.to_string(),
            account,
            added_by: None,
        };
        self.store.save(ADMINS, username, record.to_document()?).await?;
        info!(username, account = %account, "[runtime] Reference admin saved");
        Ok(record)
    }

    /// Stored admin by username.
    pub async fn find(&self, username: &str) -> Result<Option<AdminRecord>, WorkflowError> {
        self.store
            .find_one(ADMINS, username)
            .await?
            .map(AdminRecord::from_document)
            .transpose()
    }

    /// Grant `account` the admin role under `username`.
    #[instrument(skip(self), fields(role_manager = %self.role_manager))]
    pub async fn add_admin(&self, sender: Address, username: &str, account: Address) -> WorkflowResponse {
        match self.grant(sender, username, account).await {
            Ok(record) => {
                info!(username, account = %account, "[runtime] Admin added");
                WorkflowResponse {
                    admin: Some(record),
                    ..WorkflowResponse::ok("admin added")
                }
            }
            Err(err) => {
                warn!(username, error = %err, "[runtime] Admin not added");
                WorkflowResponse::failed(&err)
            }
        }
    }

    /// Revoke the admin role of `username`.
    #[instrument(skip(self), fields(role_manager = %self.role_manager))]
    pub async fn remove_admin(&self, sender: Address, username: &str) -> WorkflowResponse {
        match self.revoke(sender, username).await {
            Ok(record) => {
                info!(username, account = %record.account, "[runtime] Admin removed");
                WorkflowResponse {
                    admin: Some(record),
                    ..WorkflowResponse::ok("admin removed")
                }
            }
            Err(err) => {
                warn!(username, error = %err, "[runtime] Admin not removed");
                WorkflowResponse::failed(&err)
            }
        }
    }

    async fn grant(&self, sender: Address, username: &str, account: Address) -> Result<AdminRecord, WorkflowError> {
        self.by_account(sender)
            .await?
            .ok_or(WorkflowError::NotAdmin(sender))?;
        if self.find(username).await?.is_some() {
            return Err(WorkflowError::AlreadyAdmin(username.to_string()));
        }
        if let Some(existing) = self.by_account(account).await? {
            return Err(WorkflowError::AlreadyAdmin(existing.username));
        }
        let decision = self.delegated(sender).await?;

        let mut context = self.compensation.begin("add_admin");
        let landing = self.transact(sender, decision, ADD_ADMIN, account).await?;
        context.record(CommittedStep::new(
            format!("role:{account}"),
            sender,
            self.inverse(sender, REMOVE_ADMIN, account)?,
        ));

        if let Err(err) = self.confirm(ADMIN_ADDED, &landing, account, sender).await {
            return Err(self.unwind(context, err).await);
        }

        let record = AdminRecord {
            username: username.to_string(),
            account,
            added_by: Some(sender),
        };
        let saved = match record.to_document() {
            Ok(document) => self.store.save(ADMINS, username, document).await.map_err(Into::into),
            Err(err) => Err(err),
        };
        if let Err(err) = saved {
            return Err(self.unwind(context, err).await);
        }
        context.record(CommittedStep::new(
            format!("{ADMINS}/{username}"),
            sender,
            Arc::new(DeleteDocumentAction::new(Arc::clone(&self.store), ADMINS, username)),
        ));

        context.discard();
        Ok(record)
    }

    async fn revoke(&self, sender: Address, username: &str) -> Result<AdminRecord, WorkflowError> {
        self.by_account(sender)
            .await?
            .ok_or(WorkflowError::NotAdmin(sender))?;
        let record = self
            .find(username)
            .await?
            .ok_or_else(|| WorkflowError::UnknownAdmin(username.to_string()))?;
        if record.account == sender {
            return Err(WorkflowError::SelfRemoval);
        }
        let decision = self.delegated(sender).await?;

        let mut context = self.compensation.begin("remove_admin");
        let landing = self.transact(sender, decision, REMOVE_ADMIN, record.account).await?;
        context.record(CommittedStep::new(
            format!("role:{}", record.account),
            sender,
            self.inverse(sender, ADD_ADMIN, record.account)?,
        ));

        if let Err(err) = self.confirm(ADMIN_REMOVED, &landing, record.account, sender).await {
            return Err(self.unwind(context, err).await);
        }
        if let Err(err) = self.store.delete(ADMINS, username).await {
            return Err(self.unwind(context, err.into()).await);
        }

        context.discard();
        Ok(record)
    }

    async fn by_account(&self, account: Address) -> Result<Option<AdminRecord>, WorkflowError> {
        self.store
            .find_by(ADMINS, "account", &json!(account))
            .await?
            .map(|(_, document)| AdminRecord::from_document(document))
            .transpose()
    }

    async fn delegated(&self, sender: Address) -> Result<SignerDecision, WorkflowError> {
        match self.dispatcher.classify(sender).await? {
            SignerDecision::External => Err(WorkflowError::ExternalSigner(sender)),
            decision => Ok(decision),
        }
    }

    fn call(&self, operation: &str, account: Address) -> Result<ContractCall, WorkflowError> {
        let data = ROLE_MANAGER_ABI
            .function(operation)?
            .encode_call(&[Token::Address(account)])?;
        Ok(ContractCall::new(self.role_manager, data))
    }

    async fn transact(
        &self,
        sender: Address,
        decision: SignerDecision,
        operation: &str,
        account: Address,
    ) -> Result<Landing, WorkflowError> {
        let call = self.call(operation, account)?;
        match self
            .dispatcher
            .dispatch_with(sender, decision, &call, self.session.fees())
            .await
        {
            Ok(DispatchOutcome::Submitted(receipt)) => Ok(Landing::Mined(receipt)),
            Ok(DispatchOutcome::PendingSignature(_)) => Err(WorkflowError::ExternalSigner(sender)),
            Err(DispatchError::Confirmation {
                handle,
                submitted_at_block,
                source,
            }) => {
                warn!(operation, tx_hash = %handle.hash, error = %source, "[runtime] Role transaction unconfirmed");
                Ok(Landing::Unconfirmed {
                    handle,
                    submitted_at_block,
                    source,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn inverse(
        &self,
        sender: Address,
        operation: &str,
        account: Address,
    ) -> Result<Arc<LedgerCallAction>, WorkflowError> {
        Ok(Arc::new(LedgerCallAction::new(
            Arc::clone(&self.dispatcher),
            sender,
            self.call(operation, account)?,
            *self.session.fees(),
            format!("{operation}({account})"),
        )))
    }

    /// Find `event(account, sender)` emitted by the landed transaction.
    async fn confirm(
        &self,
        event: &'static str,
        landing: &Landing,
        account: Address,
        sender: Address,
    ) -> Result<(), WorkflowError> {
        let (tx_hash, from_block, to_block) = match landing {
            Landing::Mined(receipt) => (
                receipt.transaction_hash,
                receipt.block_number,
                receipt.block_number,
            ),
            Landing::Unconfirmed {
                handle,
                submitted_at_block,
                ..
            } => {
                let head = self.session.block_number().await?;
                warn!(
                    tx_hash = %handle.hash,
                    from_block = submitted_at_block,
                    to_block = head,
                    "[runtime] Correlating role transaction by event"
                );
                (handle.hash, *submitted_at_block, head)
            }
        };

        let descriptor = ROLE_MANAGER_ABI.event(event)?;
        let filter = ArgFilter::any().exact(account).exact(sender);
        let found = self
            .session
            .query_events(self.role_manager, descriptor, &filter, from_block, to_block)
            .await?
            .into_iter()
            .any(|e| e.transaction_hash == tx_hash);

        if found {
            return Ok(());
        }
        Err(match landing {
            Landing::Mined(receipt) => WorkflowError::EventMissing {
                event,
                tx_hash,
                block_number: receipt.block_number,
            },
            // May still be included; the queued inverse lands after it.
            Landing::Unconfirmed { source, .. } => WorkflowError::Ledger(source.clone()),
        })
    }

    async fn unwind(&self, context: WorkflowContext, err: WorkflowError) -> WorkflowError {
        let report = self.compensation.compensate(context).await;
        WorkflowError::compensated(err, report)
    }
}
