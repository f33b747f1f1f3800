//! Process runner backed by `tokio::process`

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::traits::{Invocation, ProcessRunner, RunOutcome};

/// Runs programs as child processes, capturing stdout and stderr.
///
/// On timeout the pending wait is dropped, which kills the child
/// (`kill_on_drop`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    /// Create a new runner
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<RunOutcome> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            cmd.current_dir(dir);
        }

        tracing::debug!("spawning `{}`", invocation);
        let started = Instant::now();
        let child = cmd.spawn().map_err(|source| Error::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let wait = child.wait_with_output();
        let output = match invocation.timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(output) => output?,
                Err(_) => {
                    tracing::debug!("`{}` exceeded {:?}, killed", invocation, limit);
                    return Ok(RunOutcome::TimedOut { after: limit });
                }
            },
            None => wait.await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            Ok(RunOutcome::Success {
                stdout,
                stderr,
                elapsed: started.elapsed(),
            })
        } else {
            Ok(RunOutcome::NonZeroExit {
                code: output.status.code(),
                stdout,
                stderr,
            })
        }
    }
}
