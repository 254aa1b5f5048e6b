//! Execution limits

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 64 * 1024;

/// Limits applied to every execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    /// Wall-clock deadline, measured from spawn
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Per-stream capture limit for stdout and stderr
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Largest accepted source text
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

fn default_max_source_bytes() -> usize {
    DEFAULT_MAX_SOURCE_BYTES
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
        }
    }
}

impl ExecutionLimits {
    /// Override the deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Human readable deadline for error details ("5s", "0.25s")
    pub fn timeout_label(&self) -> String {
        let millis = self.timeout.as_millis();
        if millis % 1000 == 0 {
            format!("{}s", millis / 1000)
        } else {
            format!("{}s", self.timeout.as_secs_f64())
        }
    }
}
