//! Execution dispatcher - main entry point
//!
//! Turns an [`ExecutionRequest`] into an [`ExecutionResult`]: validate, resolve
//! the interpreter, write the temp artifact, run it against the deadline,
//! release the artifact, map the outcome. Every request gets its own artifact
//! and process; the only shared state is the read-only language table.

use crate::artifact::TempArtifact;
use crate::config::SandboxConfig;
use crate::error::{ConfigResult, DispatchError};
use crate::execution::{ExecutionId, ExecutionStage, StageTracker};
use crate::language::{Language, LanguageTable};
use crate::limits::ExecutionLimits;
use crate::runtime::{Invocation, ProcessOutcome, ProcessOutput, ProcessRuntime, Runtime};
use crate::types::{ErrorKind, ExecutionRequest, ExecutionResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Message for missing code or language
pub const MISSING_FIELDS: &str = "Code and language are required!";

/// Executes untrusted source through a language interpreter
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    runtime: Arc<dyn Runtime>,
    languages: LanguageTable,
    limits: ExecutionLimits,
    work_dir: PathBuf,
}

impl Dispatcher {
    /// Create a dispatcher backed by child processes
    pub fn new(config: SandboxConfig) -> ConfigResult<Self> {
        Self::with_runtime(config, ProcessRuntime::new())
    }

    /// Create a dispatcher with a custom runtime
    pub fn with_runtime(
        config: SandboxConfig,
        runtime: impl Runtime + 'static,
    ) -> ConfigResult<Self> {
        config.validate()?;
        let languages = config.language_table()?;
        let work_dir = config.resolved_work_dir();

        tracing::info!(
            runtime = runtime.name(),
            work_dir = %work_dir.display(),
            timeout = ?config.limits.timeout,
            languages = languages.len(),
            "Dispatcher ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                runtime: Arc::new(runtime),
                languages,
                limits: config.limits,
                work_dir,
            }),
        })
    }

    pub fn languages(&self) -> &LanguageTable {
        &self.inner.languages
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.inner.limits
    }

    /// Directory that holds in-flight artifacts
    pub fn work_dir(&self) -> &Path {
        &self.inner.work_dir
    }

    /// Get the runtime name
    pub fn runtime_name(&self) -> &str {
        self.inner.runtime.name()
    }

    /// Execute a request. Every failure is reported inside the result.
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let id = ExecutionId::new();
        let span = tracing::info_span!(
            "execute",
            execution_id = %id,
            language = %request.language
        );
        self.execute_with_id(id, request).instrument(span).await
    }

    async fn execute_with_id(&self, id: ExecutionId, request: ExecutionRequest) -> ExecutionResult {
        let started = Instant::now();

        let mut result = match self.validate(&request) {
            Err(err) => {
                tracing::info!(error = %err, "Rejected request");
                failure(request.language, err)
            }
            Ok(language) => {
                let mut stages = StageTracker::new(id);
                let outcome = self.run(id, language, &request, &mut stages).await;
                let result = match outcome {
                    Ok(output) => completed(request.language, output),
                    Err(err) => failure(request.language, err),
                };
                stages.advance(ExecutionStage::ResultReturned);
                result
            }
        };

        result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            success = result.success,
            error_kind = result.error_kind.map(ErrorKind::as_str),
            duration_ms = result.duration_ms,
            "Execution finished"
        );
        result
    }

    /// Checks that run before any filesystem or process activity
    fn validate(&self, request: &ExecutionRequest) -> Result<Language, DispatchError> {
        if request.code.trim().is_empty() || request.language.trim().is_empty() {
            return Err(DispatchError::InvalidRequest(MISSING_FIELDS.to_string()));
        }

        let language: Language = request
            .language
            .parse()
            .ok()
            .filter(|language| self.inner.languages.supports(*language))
            .ok_or_else(|| {
                DispatchError::InvalidRequest(format!(
                    "Unsupported language '{}'. Supported languages: {}",
                    request.language,
                    self.supported_tags()
                ))
            })?;

        let max = self.inner.limits.max_source_bytes;
        if request.code.len() > max {
            return Err(DispatchError::InvalidRequest(format!(
                "Code is {} bytes, the limit is {} bytes",
                request.code.len(),
                max
            )));
        }

        Ok(language)
    }

    async fn run(
        &self,
        id: ExecutionId,
        language: Language,
        request: &ExecutionRequest,
        stages: &mut StageTracker,
    ) -> Result<ProcessOutput, DispatchError> {
        let Some(spec) = self.inner.languages.get(language) else {
            tracing::error!(%language, "Validated language has no interpreter");
            stages.advance(ExecutionStage::SpawnFailed);
            stages.advance(ExecutionStage::ArtifactRemoved);
            return Err(DispatchError::MissingInterpreter(language));
        };

        let artifact = match TempArtifact::create(
            &self.inner.work_dir,
            &request.identity,
            id,
            &spec.extension,
            &request.code,
        )
        .await
        {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    work_dir = %self.inner.work_dir.display(),
                    "Failed to write artifact"
                );
                stages.advance(ExecutionStage::SpawnFailed);
                stages.advance(ExecutionStage::ArtifactRemoved);
                return Err(DispatchError::Artifact(e));
            }
        };
        stages.advance(ExecutionStage::ArtifactWritten);

        let invocation = Invocation {
            interpreter: spec.interpreter.clone(),
            script: artifact.path().to_path_buf(),
        };
        stages.advance(ExecutionStage::ProcessRunning);
        let outcome = self.inner.runtime.run(invocation, &self.inner.limits).await;

        stages.advance(match &outcome {
            Ok(ProcessOutcome::Exited(_)) => ExecutionStage::Completed,
            Ok(ProcessOutcome::TimedOut) => ExecutionStage::TimedOut,
            Err(DispatchError::Spawn { .. }) => ExecutionStage::SpawnFailed,
            Err(_) => ExecutionStage::Completed,
        });

        artifact.release().await;
        stages.advance(ExecutionStage::ArtifactRemoved);

        match outcome {
            Ok(ProcessOutcome::Exited(output)) => Ok(output),
            Ok(ProcessOutcome::TimedOut) => {
                Err(DispatchError::Timeout(self.inner.limits.timeout_label()))
            }
            Err(err) => Err(err),
        }
    }

    fn supported_tags(&self) -> String {
        self.inner
            .languages
            .iter()
            .map(|(language, _)| language.tag())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Map a finished process to a result
fn completed(language: String, output: ProcessOutput) -> ExecutionResult {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let mut result = if output.success() {
        ExecutionResult::succeeded(language, stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        ExecutionResult::failed(language, ErrorKind::RuntimeError, runtime_detail(&output, stderr))
    };
    result.exit_code = output.exit_code;
    result.truncated = output.truncated;
    result
}

fn runtime_detail(output: &ProcessOutput, stderr: String) -> String {
    if !stderr.trim().is_empty() {
        return stderr;
    }
    match (output.exit_code, output.signal) {
        (Some(code), _) => format!("Process exited with status {}", code),
        (None, Some(signal)) => format!("Process terminated by signal {}", signal),
        (None, None) => "Process failed without diagnostics".to_string(),
    }
}

fn failure(language: String, err: DispatchError) -> ExecutionResult {
    let mut result = ExecutionResult::failed(language, err.kind(), err.to_string());
    if let DispatchError::Runtime { exit_code, .. } = err {
        result.exit_code = exit_code;
    }
    result
}
