//! Lifecycle of one operation invocation.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, warn};

/// Phase of an operation invocation.
///
/// Phases only move forward. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OperationPhase {
    /// Checking required inputs.
    Validating,
    /// Resolving module, prefix, names and types; staging descriptors.
    ResolvingContext,
    /// Applying DDL to the physical schema.
    MutatingSchema,
    /// Committing catalog descriptors.
    RegisteringMetadata,
    /// Completed successfully.
    Succeeded,
    /// Stopped by an error.
    Failed,
}

impl OperationPhase {
    /// Check if no further transitions are allowed.
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationPhase::Succeeded | OperationPhase::Failed)
    }
}

impl std::fmt::Display for OperationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationPhase::Validating => write!(f, "validating"),
            OperationPhase::ResolvingContext => write!(f, "resolving_context"),
            OperationPhase::MutatingSchema => write!(f, "mutating_schema"),
            OperationPhase::RegisteringMetadata => write!(f, "registering_metadata"),
            OperationPhase::Succeeded => write!(f, "succeeded"),
            OperationPhase::Failed => write!(f, "failed"),
        }
    }
}

/// A rejected phase change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid operation transition: {from} -> {to}")]
pub struct InvalidTransition {
    /// Phase the operation was in.
    pub from: OperationPhase,
    /// Requested phase.
    pub to: OperationPhase,
}

/// Progress record of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationState {
    /// Operation name.
    pub operation: String,
    /// Current phase.
    pub phase: OperationPhase,
    /// Phases entered, with entry times in microseconds since the epoch.
    pub history: Vec<(OperationPhase, u64)>,
    /// Failure message, once failed.
    pub error: Option<String>,
}

impl OperationState {
    /// Start tracking an invocation in `Validating`.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            phase: OperationPhase::Validating,
            history: vec![(OperationPhase::Validating, now_micros())],
            error: None,
        }
    }

    /// Move forward to `phase`. Intermediate phases may be skipped.
    pub fn advance(&mut self, phase: OperationPhase) -> Result<(), InvalidTransition> {
        if self.phase.is_terminal() || phase <= self.phase || phase == OperationPhase::Failed {
            return Err(InvalidTransition {
                from: self.phase,
                to: phase,
            });
        }
        debug!(operation = %self.operation, from = %self.phase, to = %phase, "operation phase");
        self.enter(phase);
        Ok(())
    }

    /// Mark the invocation successful.
    pub fn succeed(&mut self) -> Result<(), InvalidTransition> {
        self.advance(OperationPhase::Succeeded)
    }

    /// Mark the invocation failed. Allowed from any non-terminal phase.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), InvalidTransition> {
        if self.phase.is_terminal() {
            return Err(InvalidTransition {
                from: self.phase,
                to: OperationPhase::Failed,
            });
        }
        let error = error.into();
        warn!(operation = %self.operation, phase = %self.phase, error = %error, "operation failed");
        self.error = Some(error);
        self.enter(OperationPhase::Failed);
        Ok(())
    }

    /// Phase the invocation failed in, if it failed.
    pub fn failed_in(&self) -> Option<OperationPhase> {
        if self.phase != OperationPhase::Failed {
            return None;
        }
        self.history
            .iter()
            .rev()
            .map(|(phase, _)| *phase)
            .find(|phase| *phase != OperationPhase::Failed)
    }

    /// Elapsed microseconds between the first and last transition.
    pub fn elapsed_micros(&self) -> u64 {
        match (self.history.first(), self.history.last()) {
            (Some((_, start)), Some((_, end))) => end.saturating_sub(*start),
            _ => 0,
        }
    }

    fn enter(&mut self, phase: OperationPhase) {
        self.phase = phase;
        self.history.push((phase, now_micros()));
    }
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
