//! Configuration for the execution dispatcher
//!
//! Resolution order: built-in defaults, then a TOML file, then environment
//! overrides (`CODERUN_WORK_DIR`, `CODERUN_TIMEOUT_SECS`).

use crate::error::{ConfigError, ConfigResult};
use crate::language::{Language, LanguageTable};
use crate::limits::ExecutionLimits;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_WORK_DIR: &str = "CODERUN_WORK_DIR";
pub const ENV_TIMEOUT_SECS: &str = "CODERUN_TIMEOUT_SECS";

const MAX_TIMEOUT_SECS: f64 = 86_400.0;

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Directory holding temp artifacts; relative paths resolve against the cwd
    #[serde(default = "SandboxConfig::default_work_dir")]
    pub work_dir: PathBuf,

    #[serde(flatten)]
    pub limits: ExecutionLimits,

    /// Interpreter overrides keyed by language tag
    #[serde(default)]
    pub interpreters: BTreeMap<String, String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            work_dir: Self::default_work_dir(),
            limits: ExecutionLimits::default(),
            interpreters: BTreeMap::new(),
        }
    }
}

impl SandboxConfig {
    fn default_work_dir() -> PathBuf {
        PathBuf::from("temp")
    }

    /// `<config_dir>/coderun/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("coderun").join("config.toml"))
    }

    /// Set the interpreter for a language tag; enables opt-in languages
    pub fn with_interpreter(
        mut self,
        tag: impl Into<String>,
        interpreter: impl Into<String>,
    ) -> Self {
        self.interpreters.insert(tag.into(), interpreter.into());
        self
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// when present, otherwise built-in defaults. Environment overrides are
    /// applied last and the result is validated.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        if let Some(dir) = lookup(ENV_WORK_DIR).filter(|v| !v.trim().is_empty()) {
            self.work_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: f64 = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{} must be a number, got '{}'", ENV_TIMEOUT_SECS, raw))
            })?;
            if !secs.is_finite() || secs <= 0.0 || secs > MAX_TIMEOUT_SECS {
                return Err(ConfigError::Invalid(format!(
                    "{} must be between 0 and {}, got '{}'",
                    ENV_TIMEOUT_SECS, MAX_TIMEOUT_SECS, raw
                )));
            }
            self.limits.timeout = Duration::from_secs_f64(secs);
        }
        Ok(())
    }

    /// Reject values the dispatcher cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.limits.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be greater than zero".into()));
        }
        if self.limits.max_output_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_output_bytes must be greater than zero".into(),
            ));
        }
        if self.limits.max_source_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_source_bytes must be greater than zero".into(),
            ));
        }
        if self.work_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("work_dir must not be empty".into()));
        }
        self.interpreter_overrides().map(|_| ())
    }

    /// Build the read-only language table
    pub fn language_table(&self) -> ConfigResult<LanguageTable> {
        let overrides = self.interpreter_overrides()?;
        Ok(LanguageTable::with_overrides(
            overrides
                .iter()
                .map(|(language, interpreter)| (*language, interpreter.as_str())),
        ))
    }

    /// Work dir as an absolute path
    pub fn resolved_work_dir(&self) -> PathBuf {
        if self.work_dir.is_absolute() {
            return self.work_dir.clone();
        }
        std::env::current_dir()
            .map(|cwd| cwd.join(&self.work_dir))
            .unwrap_or_else(|_| self.work_dir.clone())
    }

    fn interpreter_overrides(&self) -> ConfigResult<Vec<(Language, String)>> {
        self.interpreters
            .iter()
            .map(|(tag, interpreter)| {
                let language: Language = tag.parse().map_err(|_| {
                    ConfigError::Invalid(format!("unknown language '{}' in [interpreters]", tag))
                })?;
                if interpreter.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "interpreter for '{}' must not be empty",
                        tag
                    )));
                }
                Ok((language, interpreter.trim().to_string()))
            })
            .collect()
    }
}
