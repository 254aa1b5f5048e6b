//! Process-based runtime

use super::{Invocation, ProcessOutcome, ProcessOutput, Runtime};
use crate::error::DispatchError;
use crate::limits::ExecutionLimits;
use async_trait::async_trait;
use std::io;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

const READ_CHUNK: usize = 8 * 1024;

/// Process-based runtime - runs the interpreter as a child process
///
/// The child gets its own process group so a timeout can kill everything it
/// started. Source text only ever reaches the child through the script file.
#[derive(Debug, Clone, Default)]
pub struct ProcessRuntime;

impl ProcessRuntime {
    pub fn new() -> Self {
        Self
    }

    fn command(invocation: &Invocation) -> Command {
        let mut std_command = std::process::Command::new(&invocation.interpreter);
        std_command
            .arg(&invocation.script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            std_command.process_group(0);
        }

        let mut command = Command::from(std_command);
        command.kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Runtime for ProcessRuntime {
    async fn run(
        &self,
        invocation: Invocation,
        limits: &ExecutionLimits,
    ) -> Result<ProcessOutcome, DispatchError> {
        let mut child = Self::command(&invocation)
            .spawn()
            .map_err(|source| DispatchError::Spawn {
                interpreter: invocation.interpreter.clone(),
                source,
            })?;
        let pid = child.id();
        // Armed until the group is killed below; covers a dropped `run` future
        let mut group = GroupGuard::new(pid);
        tracing::debug!(pid, interpreter = %invocation.interpreter, "Process spawned");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let cap = limits.max_output_bytes;

        let deadline = tokio::time::sleep(limits.timeout);
        tokio::pin!(deadline);

        // Exit plus fully drained pipes, raced against the deadline. The
        // losing sleep is dropped here; a losing process is killed below.
        let finished = {
            let exited = async {
                let status = child.wait().await;
                // Same poll as the reap, so the pgid is still ours. Also closes
                // pipes held open by background children.
                group.kill();
                status
            };
            let collect = async {
                let (status, out, err) = tokio::join!(
                    exited,
                    read_capped(stdout, cap),
                    read_capped(stderr, cap)
                );
                Ok::<_, io::Error>((status?, out?, err?))
            };
            tokio::select! {
                result = collect => Some(result),
                _ = &mut deadline => None,
            }
        };

        match finished {
            Some(Ok((status, (stdout, stdout_truncated), (stderr, stderr_truncated)))) => {
                tracing::debug!(pid, status = %status, "Process exited");
                Ok(ProcessOutcome::Exited(ProcessOutput {
                    exit_code: status.code(),
                    signal: exit_signal(&status),
                    stdout,
                    stderr,
                    truncated: stdout_truncated || stderr_truncated,
                }))
            }
            Some(Err(e)) => {
                terminate(&mut child, &mut group).await;
                Err(DispatchError::Runtime {
                    detail: format!("Process wait error: {}", e),
                    exit_code: None,
                })
            }
            None => {
                tracing::info!(
                    pid,
                    timeout = ?limits.timeout,
                    "Deadline exceeded, killing process group"
                );
                terminate(&mut child, &mut group).await;
                Ok(ProcessOutcome::TimedOut)
            }
        }
    }

    fn name(&self) -> &str {
        "process"
    }
}

/// Read a stream to EOF, keeping at most `cap` bytes
///
/// Bytes past the cap are drained and dropped so the child never blocks on a
/// full pipe.
async fn read_capped<R>(reader: Option<R>, cap: usize) -> io::Result<(Vec<u8>, bool)>
where
    R: AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return Ok((Vec::new(), false));
    };

    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    let mut truncated = false;
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(buf.len());
        if n > room {
            truncated = true;
        }
        buf.extend_from_slice(&chunk[..n.min(room)]);
    }
    Ok((buf, truncated))
}

/// Process group of one spawned interpreter, killed at most once
///
/// `kill_on_drop` only reaches the direct child. When the `run` future is
/// dropped mid-flight, this guard takes the rest of the group with it.
struct GroupGuard {
    pid: Option<u32>,
    armed: bool,
}

impl GroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pid,
            armed: pid.is_some(),
        }
    }

    /// SIGKILL the group and disarm
    fn kill(&mut self) {
        if std::mem::replace(&mut self.armed, false) {
            kill_group(self.pid);
        }
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!(pid = self.pid, "Run dropped, killing process group");
            self.kill();
        }
    }
}

/// SIGKILL the process group, then make sure the direct child is reaped
async fn terminate(child: &mut Child, group: &mut GroupGuard) {
    let pid = group.pid;
    group.kill();
    if let Err(e) = child.start_kill() {
        tracing::debug!(pid, error = %e, "start_kill after group kill");
    }
    match child.wait().await {
        Ok(status) => tracing::debug!(pid, status = %status, "Process reaped"),
        Err(e) => tracing::warn!(pid, error = %e, "Failed to reap process"),
    }
}

/// SIGKILL every member of the group led by `pid`
///
/// A pgid stays reserved while any member lives. Once the group is empty the
/// number could be recycled, so callers kill before or right after reaping
/// the leader, never later.
#[cfg(unix)]
fn kill_group(pid: Option<u32>) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pgid, error = %e, "Failed to kill process group"),
    }
}

#[cfg(not(unix))]
fn kill_group(_pid: Option<u32>) {}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
