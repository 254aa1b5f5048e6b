//! Core types for sandbox execution

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel returned as output when a successful program printed nothing
pub const NO_OUTPUT: &str = "No output";

/// Identity used for artifact naming when the caller supplies none
pub const ANONYMOUS: &str = "anonymous";

/// Request to execute code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// The source text to execute
    #[serde(default)]
    pub code: String,

    /// Language tag as supplied by the caller (echoed back verbatim)
    #[serde(default)]
    pub language: String,

    /// Caller identity, used only to name the temp artifact
    #[serde(default = "default_identity")]
    pub identity: String,
}

fn default_identity() -> String {
    ANONYMOUS.to_string()
}

impl ExecutionRequest {
    /// Create a request for an anonymous caller
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            identity: default_identity(),
        }
    }

    /// Set the caller identity
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }
}

/// Failure categories surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Empty source, oversized source or unsupported language
    InvalidRequest,
    /// The interpreter could not be started
    SpawnError,
    /// The program ran and failed
    RuntimeError,
    /// The deadline fired and the process tree was killed
    Timeout,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::SpawnError => "SpawnError",
            ErrorKind::RuntimeError => "RuntimeError",
            ErrorKind::Timeout => "Timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal value of a single execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,

    /// Captured stdout on success
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,

    /// Language exactly as the caller sent it
    pub language: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    /// Exit code of the interpreter, when it exited normally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    /// Wall-clock duration of the whole call
    #[serde(default)]
    pub duration_ms: u64,

    /// Whether stdout or stderr hit the capture limit
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl ExecutionResult {
    pub(crate) fn succeeded(language: String, stdout: String) -> Self {
        let output = if stdout.is_empty() {
            NO_OUTPUT.to_string()
        } else {
            stdout
        };
        Self {
            success: true,
            output,
            language,
            error_kind: None,
            error_detail: None,
            exit_code: Some(0),
            duration_ms: 0,
            truncated: false,
        }
    }

    pub(crate) fn failed(language: String, kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            language,
            error_kind: Some(kind),
            error_detail: Some(detail.into()),
            exit_code: None,
            duration_ms: 0,
            truncated: false,
        }
    }

    /// Error kind, if the execution failed
    pub fn kind(&self) -> Option<ErrorKind> {
        self.error_kind
    }

    /// Check the result against an expected failure kind
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.error_kind == Some(kind)
    }
}
