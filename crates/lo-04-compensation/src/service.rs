//! # Compensation Manager
//!
//! Replays a workflow's committed steps in reverse. Each inverse is
//! best-effort: a failure is logged and reported, and the remaining
//! inverses still run.

use crate::domain::{CompensationReport, CompensationResult, WorkflowContext};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{error, info, instrument, warn};

/// Compensation counters.
#[derive(Debug, Default)]
pub struct CompensationStats {
    /// Workflows compensated.
    pub workflows: AtomicU64,
    /// Inverses that succeeded.
    pub succeeded: AtomicU64,
    /// Inverses that failed.
    pub failed: AtomicU64,
}

/// Compensation Manager.
#[derive(Debug, Default)]
pub struct CompensationManager {
    stats: CompensationStats,
}

impl CompensationManager {
    /// New manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a workflow context.
    pub fn begin(&self, name: &str) -> WorkflowContext {
        WorkflowContext::new(name)
    }

    /// Compensation counters.
    pub fn stats(&self) -> &CompensationStats {
        &self.stats
    }

    /// Undo every committed step, last first.
    #[instrument(skip(self, context), fields(workflow_id = %context.id(), workflow = %context.name()))]
    pub async fn compensate(&self, context: WorkflowContext) -> CompensationReport {
        let (workflow_id, _, steps) = context.into_parts();
        self.stats.workflows.fetch_add(1, Ordering::Relaxed);

        if steps.is_empty() {
            return CompensationReport::empty(workflow_id);
        }
        warn!(steps = steps.len(), "[lo-04] Compensating workflow");

        let mut results = Vec::with_capacity(steps.len());
        for step in steps.into_iter().rev() {
            let action = step.action.describe();
            let result = match step.action.compensate().await {
                Ok(()) => {
                    self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                    warn!(resource = %step.resource, actor = %step.actor, action = %action, "[lo-04] Step compensated");
                    CompensationResult {
                        resource: step.resource,
                        action,
                        succeeded: true,
                        error: None,
                    }
                }
                Err(err) => {
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    error!(resource = %step.resource, actor = %step.actor, action = %action, error = %err, "[lo-04] Compensation failed");
                    CompensationResult {
                        resource: step.resource,
                        action,
                        succeeded: false,
                        error: Some(err.to_string()),
                    }
                }
            };
            results.push(result);
        }

        let report = CompensationReport {
            workflow_id,
            results,
        };
        if report.all_succeeded() {
            info!("[lo-04] Workflow rolled back");
        }
        report
    }
}
