//! Execution identity and lifecycle stages

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique execution identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub uuid::Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// First eight hex digits, used in artifact names
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-request lifecycle
///
/// `Validated → ArtifactWritten → ProcessRunning → {Completed | TimedOut | SpawnFailed}
/// → ArtifactRemoved → ResultReturned`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStage {
    Validated,
    ArtifactWritten,
    ProcessRunning,
    Completed,
    TimedOut,
    SpawnFailed,
    ArtifactRemoved,
    ResultReturned,
}

impl ExecutionStage {
    /// Whether `next` is a legal successor of this stage
    pub fn can_advance_to(self, next: ExecutionStage) -> bool {
        use ExecutionStage::*;
        matches!(
            (self, next),
            (Validated, ArtifactWritten)
                | (Validated, SpawnFailed)
                | (ArtifactWritten, ProcessRunning)
                | (ArtifactWritten, SpawnFailed)
                | (ProcessRunning, Completed)
                | (ProcessRunning, TimedOut)
                | (ProcessRunning, SpawnFailed)
                | (Completed, ArtifactRemoved)
                | (TimedOut, ArtifactRemoved)
                | (SpawnFailed, ArtifactRemoved)
                | (ArtifactRemoved, ResultReturned)
        )
    }
}

/// Tracks one execution through its stages, emitting a debug event per step
#[derive(Debug)]
pub(crate) struct StageTracker {
    id: ExecutionId,
    stage: ExecutionStage,
}

impl StageTracker {
    pub(crate) fn new(id: ExecutionId) -> Self {
        tracing::debug!(execution_id = %id, stage = ?ExecutionStage::Validated, "stage");
        Self {
            id,
            stage: ExecutionStage::Validated,
        }
    }

    pub(crate) fn advance(&mut self, next: ExecutionStage) {
        debug_assert!(
            self.stage.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.stage,
            next
        );
        tracing::debug!(execution_id = %self.id, from = ?self.stage, stage = ?next, "stage");
        self.stage = next;
    }

    #[cfg(test)]
    pub(crate) fn stage(&self) -> ExecutionStage {
        self.stage
    }
}
