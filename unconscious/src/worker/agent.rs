//! One engine process from spawn to reap
//!
//! The agent pipes all stdio, registers itself once the spawn succeeds, and races the
//! combined stdout/stderr/exit future against a single timeout. Whichever way the process
//! ends, its lease in the registry is finished exactly once.

use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use unconscious_sdk::AgentStatus;

use crate::error::TaskError;
use crate::worker::launcher::{Invocation, ProcessLauncher};
use crate::worker::registry::AgentRegistry;

/// Captured output of a process that exited with status 0
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    /// Diagnostics only, never parsed
    pub stderr: String,
}

pub struct ProcessAgent<'a> {
    launcher: &'a dyn ProcessLauncher,
    registry: &'a AgentRegistry,
    timeout: Duration,
}

impl<'a> ProcessAgent<'a> {
    pub fn new(
        launcher: &'a dyn ProcessLauncher,
        registry: &'a AgentRegistry,
        timeout: Duration,
    ) -> Self {
        Self {
            launcher,
            registry,
            timeout,
        }
    }

    /// Spawn, wait and clean up
    ///
    /// A spawn failure returns before anything is registered.
    pub async fn run(&self, invocation: Invocation<'_>) -> Result<ProcessOutput, TaskError> {
        let program = self.launcher.program();
        let task_id = invocation.task.id.as_str();

        let mut cmd = self.launcher.command(&invocation);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| {
            tracing::warn!(task_id, program = %program, error = %source, "engine spawn failed");
            TaskError::Spawn {
                program: program.clone(),
                source,
            }
        })?;

        let mut lease = self.registry.register(task_id);
        let agent_id = lease.id();

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let exchange = async {
            let (status, out, err) =
                tokio::join!(child.wait(), read_stream(stdout), read_stream(stderr));
            Ok::<_, std::io::Error>((status?, out?, err?))
        };

        let settled = tokio::time::timeout(self.timeout, exchange).await;

        match settled {
            Err(_) => {
                tracing::warn!(task_id, %agent_id, timeout_ms = self.timeout.as_millis() as u64, "engine timed out, killing");
                if let Err(e) = child.start_kill() {
                    tracing::debug!(task_id, %agent_id, error = %e, "kill after timeout failed");
                }
                let _ = child.wait().await;
                lease.finish(AgentStatus::Failed);
                Err(TaskError::Timeout)
            }
            Ok(Err(source)) => {
                let _ = child.start_kill();
                lease.finish(AgentStatus::Failed);
                Err(TaskError::Spawn { program, source })
            }
            Ok(Ok((status, stdout, stderr))) if status.success() => {
                lease.finish(AgentStatus::Completed);
                tracing::debug!(task_id, %agent_id, stdout_bytes = stdout.len(), "engine exited cleanly");
                Ok(ProcessOutput { stdout, stderr })
            }
            Ok(Ok((status, _stdout, stderr))) => {
                lease.finish(AgentStatus::Failed);
                let code = status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                tracing::warn!(task_id, %agent_id, code = %code, "engine exited with failure");
                Err(TaskError::NonZeroExit {
                    code,
                    stderr: stderr.trim().to_string(),
                })
            }
        }
    }
}

async fn read_stream<R>(stream: Option<R>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
