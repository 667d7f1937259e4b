//! # Deployment State Machine
//!
//! ```text
//! Building ─► Submitting ─► AwaitingConfirmation ─► Verifying ─► Registered
//!    │            │                  │                  │
//!    └────────────┴──────────────────┴──────────────────┴──────► Failed
//! ```
//!
//! `Registered` and `Failed` are terminal. Any other move is a bug in the
//! orchestrator and is reported as [`DeployError::InvalidTransition`].

use crate::domain::DeployError;
use serde::Serialize;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

/// Stage of one deployment request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum DeploymentState {
    /// Resolving the type, generating the salt, encoding the call.
    Building,
    /// Handing the call to the dispatcher.
    Submitting,
    /// Waiting for inclusion, or for the caller's signature.
    AwaitingConfirmation,
    /// Correlating the registry event.
    Verifying,
    /// Record confirmed.
    Registered,
    /// Aborted.
    Failed,
}

impl DeploymentState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Registered | Self::Failed)
    }

    /// Whether `next` is a legal successor.
    pub fn can_transition_to(&self, next: DeploymentState) -> bool {
        use DeploymentState::*;
        match (self, next) {
            (Building, Submitting)
            | (Submitting, AwaitingConfirmation)
            | (AwaitingConfirmation, Verifying)
            | (Verifying, Registered) => true,
            (current, Failed) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a run is doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DeploymentKind {
    /// Fresh proxy and logic.
    Deploy,
    /// New logic behind an existing proxy.
    Upgrade,
}

impl fmt::Display for DeploymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deploy => f.write_str("deploy"),
            Self::Upgrade => f.write_str("upgrade"),
        }
    }
}

/// One pass through the state machine.
#[derive(Clone, Debug)]
pub struct DeploymentRun {
    workflow_id: Uuid,
    kind: DeploymentKind,
    state: DeploymentState,
    history: Vec<DeploymentState>,
}

impl DeploymentRun {
    /// Run in `Building`.
    pub fn new(workflow_id: Uuid, kind: DeploymentKind) -> Self {
        Self {
            workflow_id,
            kind,
            state: DeploymentState::Building,
            history: vec![DeploymentState::Building],
        }
    }

    /// Workflow this run belongs to.
    pub fn workflow_id(&self) -> Uuid {
        self.workflow_id
    }

    /// Deploy or upgrade.
    pub fn kind(&self) -> DeploymentKind {
        self.kind
    }

    /// Current state.
    pub fn state(&self) -> DeploymentState {
        self.state
    }

    /// Every state visited, in order.
    pub fn history(&self) -> &[DeploymentState] {
        &self.history
    }

    /// Move to `next`.
    pub fn advance(&mut self, next: DeploymentState) -> Result<(), DeployError> {
        if !self.state.can_transition_to(next) {
            return Err(DeployError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(
            workflow_id = %self.workflow_id,
            kind = %self.kind,
            from = %self.state,
            to = %next,
            "[lo-05] State transition"
        );
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Move to `Failed` unless already terminal.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = DeploymentState::Failed;
            self.history.push(DeploymentState::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DeploymentState::*;

    #[test]
    fn test_happy_path() {
        let mut run = DeploymentRun::new(Uuid::new_v4(), DeploymentKind::Deploy);
        for next in [Submitting, AwaitingConfirmation, Verifying, Registered] {
            run.advance(next).unwrap();
        }
        assert_eq!(run.state(), Registered);
        assert_eq!(run.history().len(), 5);
    }

    #[test]
    fn test_skipping_a_stage_is_rejected() {
        let mut run = DeploymentRun::new(Uuid::new_v4(), DeploymentKind::Deploy);
        let err = run.advance(Verifying).unwrap_err();
        assert!(matches!(
            err,
            DeployError::InvalidTransition { from: Building, to: Verifying }
        ));
        assert_eq!(run.state(), Building);
    }

    #[test]
    fn test_terminal_states() {
        let mut run = DeploymentRun::new(Uuid::new_v4(), DeploymentKind::Upgrade);
        run.advance(Submitting).unwrap();
        run.fail();
        assert_eq!(run.state(), Failed);
        assert!(run.advance(AwaitingConfirmation).is_err());

        // Failing twice records once.
        run.fail();
        assert_eq!(run.history(), &[Building, Submitting, Failed]);
    }

    #[test]
    fn test_registered_cannot_fail() {
        assert!(!Registered.can_transition_to(Failed));
        assert!(Verifying.can_transition_to(Failed));
    }
}
