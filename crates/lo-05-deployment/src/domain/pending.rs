//! # Paused Workflows
//!
//! External-signature deployments wait here between the hand-back of the
//! unsigned transaction and the caller's signed payload. They are keyed by
//! `(account, nonce)`, the only pair a signed payload reveals before it is
//! mined.
//!
//! There is no cancellation. A workflow the caller never resumes expires
//! on the next sweep.

use crate::domain::InFlight;
use dashmap::DashMap;
use shared_types::Address;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A paused workflow.
#[derive(Debug)]
pub struct PendingWorkflow {
    /// Deployment state at the pause.
    pub flight: InFlight,
    /// When the unsigned transaction was handed out.
    pub paused_at: Instant,
}

impl PendingWorkflow {
    /// Workflow id.
    pub fn workflow_id(&self) -> Uuid {
        self.flight.run.workflow_id()
    }
}

/// Paused workflows by `(account, nonce)`.
#[derive(Debug, Default)]
pub struct PendingWorkflows {
    entries: DashMap<(Address, u64), PendingWorkflow>,
}

impl PendingWorkflows {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a workflow.
    pub fn park(&self, account: Address, nonce: u64, flight: InFlight) {
        self.entries.insert(
            (account, nonce),
            PendingWorkflow {
                flight,
                paused_at: Instant::now(),
            },
        );
    }

    /// Remove and return the workflow waiting on `(account, nonce)`.
    pub fn take(&self, account: Address, nonce: u64) -> Option<PendingWorkflow> {
        self.entries.remove(&(account, nonce)).map(|(_, workflow)| workflow)
    }

    /// Workflow id waiting on `(account, nonce)`.
    pub fn workflow_id(&self, account: Address, nonce: u64) -> Option<Uuid> {
        self.entries
            .get(&(account, nonce))
            .map(|entry| entry.workflow_id())
    }

    /// Number of paused workflows.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is paused.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every workflow paused for at least `ttl`.
    pub fn expire(&self, ttl: Duration) -> Vec<((Address, u64), PendingWorkflow)> {
        let expired: Vec<(Address, u64)> = self
            .entries
            .iter()
            .filter(|entry| entry.paused_at.elapsed() >= ttl)
            .map(|entry| *entry.key())
            .collect();

        expired
            .into_iter()
            .filter_map(|key| self.entries.remove(&key))
            .collect()
    }
}
