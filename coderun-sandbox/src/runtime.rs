//! Runtime trait and implementations

mod process;

use crate::error::DispatchError;
use crate::limits::ExecutionLimits;
use async_trait::async_trait;
use std::path::PathBuf;

pub use process::ProcessRuntime;

/// One interpreter launch: `<interpreter> <script>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub interpreter: String,
    pub script: PathBuf,
}

/// Captured result of a process that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    /// Terminating signal on unix
    pub signal: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Whether either stream hit the capture limit
    pub truncated: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// How the race between process and deadline ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Exited(ProcessOutput),
    TimedOut,
}

/// Runtime abstraction for executing a prepared source file
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Run the invocation under the given limits.
    ///
    /// Returns `Err` only when the process could not be started or waited on;
    /// program failures and timeouts are reported through [`ProcessOutcome`].
    async fn run(
        &self,
        invocation: Invocation,
        limits: &ExecutionLimits,
    ) -> Result<ProcessOutcome, DispatchError>;

    /// Get runtime name
    fn name(&self) -> &str;
}
