//! # Domain Entities
//!
//! The working set of one orchestrated request.

use crate::ports::CompensationAction;
use serde::Serialize;
use shared_types::Address;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A step whose effect has been confirmed, with its inverse.
#[derive(Clone)]
pub struct CommittedStep {
    /// Resource the step touched (contract address, record key, ...).
    pub resource: String,
    /// Account or address used to touch it.
    pub actor: Address,
    /// Inverse operation.
    pub action: Arc<dyn CompensationAction>,
}

impl CommittedStep {
    /// Step with its inverse.
    pub fn new(
        resource: impl Into<String>,
        actor: Address,
        action: Arc<dyn CompensationAction>,
    ) -> Self {
        Self {
            resource: resource.into(),
            actor,
            action,
        }
    }
}

impl fmt::Debug for CommittedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommittedStep")
            .field("resource", &self.resource)
            .field("actor", &self.actor)
            .field("action", &self.action.describe())
            .finish()
    }
}

/// Ordered committed steps of one workflow.
///
/// Lives for one request. Replayed in reverse on failure, discarded on
/// success.
#[derive(Debug)]
pub struct WorkflowContext {
    id: Uuid,
    name: String,
    steps: Vec<CommittedStep>,
}

impl WorkflowContext {
    /// Fresh context with a random id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Workflow id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Workflow name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a confirmed step.
    pub fn record(&mut self, step: CommittedStep) {
        self.steps.push(step);
    }

    /// Steps in commit order.
    pub fn steps(&self) -> &[CommittedStep] {
        &self.steps
    }

    /// Number of committed steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether nothing was committed.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Drop the context after overall success.
    pub fn discard(self) -> usize {
        self.steps.len()
    }

    pub(crate) fn into_parts(self) -> (Uuid, String, Vec<CommittedStep>) {
        (self.id, self.name, self.steps)
    }
}

/// Outcome of one compensating action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationResult {
    /// Resource the step touched.
    pub resource: String,
    /// Action description.
    pub action: String,
    /// Whether the inverse succeeded.
    pub succeeded: bool,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything compensation did for one workflow, in replay order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompensationReport {
    /// Workflow id.
    pub workflow_id: Uuid,
    /// Per-step results, last committed first.
    pub results: Vec<CompensationResult>,
}

impl CompensationReport {
    /// Report for a workflow with nothing to undo.
    pub fn empty(workflow_id: Uuid) -> Self {
        Self {
            workflow_id,
            results: Vec::new(),
        }
    }

    /// Whether every inverse succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.succeeded)
    }

    /// Results that need manual reconciliation.
    pub fn failures(&self) -> impl Iterator<Item = &CompensationResult> {
        self.results.iter().filter(|r| !r.succeeded)
    }
}

impl fmt::Display for CompensationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failures().count();
        write!(
            f,
            "{} compensations, {} failed",
            self.results.len(),
            failed
        )?;
        for failure in self.failures() {
            write!(
                f,
                "; {} ({}): {}",
                failure.resource,
                failure.action,
                failure.error.as_deref().unwrap_or("unknown")
            )?;
        }
        Ok(())
    }
}
