use crate::language::Language;
use crate::types::ErrorKind;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that end an execution early
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Failed to start interpreter '{interpreter}': {source}")]
    Spawn {
        interpreter: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to prepare source file: {0}")]
    Artifact(#[source] io::Error),

    #[error("No interpreter configured for language '{0}'")]
    MissingInterpreter(Language),

    #[error("{detail}")]
    Runtime {
        detail: String,
        exit_code: Option<i32>,
    },

    #[error("Code execution timed out after {0}")]
    Timeout(String),
}

impl DispatchError {
    /// Category reported to the caller
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            DispatchError::Spawn { .. }
            | DispatchError::Artifact(_)
            | DispatchError::MissingInterpreter(_) => ErrorKind::SpawnError,
            DispatchError::Runtime { .. } => ErrorKind::RuntimeError,
            DispatchError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
