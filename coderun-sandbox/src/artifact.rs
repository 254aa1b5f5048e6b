//! Scoped temp files holding source text for a single execution
//!
//! A [`TempArtifact`] is created right before the interpreter is spawned and
//! removed exactly once: either through [`TempArtifact::release`] on the normal
//! path, or from `Drop` when the owning future panics or is cancelled.
//! Removal failures are logged and never reported to the caller.

use crate::execution::ExecutionId;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const IDENTITY_MAX_LEN: usize = 32;

/// Owned temp file, deleted when released or dropped
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    released: bool,
}

impl TempArtifact {
    /// Write `source` to a fresh file in `dir`, creating `dir` if needed.
    ///
    /// Runs on the blocking pool; if the caller is cancelled meanwhile, the
    /// finished guard is dropped with the task output and the file removed.
    pub async fn create(
        dir: &Path,
        identity: &str,
        id: ExecutionId,
        extension: &str,
        source: &str,
    ) -> io::Result<Self> {
        let dir = dir.to_path_buf();
        let name = artifact_name(identity, id, extension);
        let source = source.to_owned();

        let artifact = tokio::task::spawn_blocking(move || Self::write(&dir, &name, &source))
            .await
            .map_err(io::Error::other)??;

        tracing::debug!(
            execution_id = %id,
            path = %artifact.path.display(),
            "Artifact written"
        );
        Ok(artifact)
    }

    fn write(dir: &Path, name: &str, source: &str) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join(name);
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;

        // Owned from here on, so a failed write still removes the file
        let artifact = Self {
            path,
            released: false,
        };
        file.write_all(source.as_bytes())?;
        file.flush()?;
        Ok(artifact)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file, logging instead of failing
    pub async fn release(mut self) {
        self.released = true;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn_cleanup(&self.path, &e);
        } else {
            tracing::debug!(path = %self.path.display(), "Artifact removed");
        }
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Artifact removed on drop"),
            Err(e) => warn_cleanup(&self.path, &e),
        }
    }
}

fn warn_cleanup(path: &Path, error: &io::Error) {
    tracing::warn!(
        kind = "CleanupWarning",
        path = %path.display(),
        error = %error,
        "Failed to remove temp artifact"
    );
}

/// `code_<identity>_<unix-nanos>_<id8>.<ext>`
pub fn artifact_name(identity: &str, id: ExecutionId, extension: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!(
        "code_{}_{}_{}.{}",
        sanitize_identity(identity),
        nanos,
        id.short(),
        extension
    )
}

/// Restrict identity to `[A-Za-z0-9_-]` so it cannot escape the work dir
pub fn sanitize_identity(identity: &str) -> String {
    let cleaned: String = identity
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .take(IDENTITY_MAX_LEN)
        .collect();
    if cleaned.is_empty() {
        crate::types::ANONYMOUS.to_string()
    } else {
        cleaned
    }
}
