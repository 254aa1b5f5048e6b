//! Coderun Sandbox - transient code execution
//!
//! Writes caller-supplied source to a uniquely named temp file, runs it with
//! the language's interpreter under a wall-clock deadline, and reports a
//! structured result. The temp file is removed on every path.
//!
//! ```no_run
//! use coderun_sandbox::{Dispatcher, ExecutionRequest, SandboxConfig};
//!
//! # async fn demo() -> Result<(), coderun_sandbox::ConfigError> {
//! let dispatcher = Dispatcher::new(SandboxConfig::default())?;
//! let result = dispatcher
//!     .execute(ExecutionRequest::new("print('hi')", "python"))
//!     .await;
//! println!("{}", result.output);
//! # Ok(())
//! # }
//! ```

mod artifact;
mod config;
mod dispatcher;
mod error;
mod execution;
mod language;
mod limits;
mod runtime;
mod types;

pub use artifact::TempArtifact;
pub use config::{SandboxConfig, ENV_TIMEOUT_SECS, ENV_WORK_DIR};
pub use dispatcher::{Dispatcher, MISSING_FIELDS};
pub use error::{ConfigError, ConfigResult, DispatchError};
pub use execution::{ExecutionId, ExecutionStage};
pub use language::{Language, LanguageSpec, LanguageTable, UnsupportedLanguage};
pub use limits::ExecutionLimits;
pub use runtime::{Invocation, ProcessOutcome, ProcessOutput, ProcessRuntime, Runtime};
pub use types::{ErrorKind, ExecutionRequest, ExecutionResult, ANONYMOUS, NO_OUTPUT};
