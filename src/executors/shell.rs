// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Shell executor
//!
//! Runs a stage command through `shell -c` in its own process group. On
//! timeout the whole group is killed so no descendant (browser drivers,
//! port-holding servers) outlives the stage.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::{ExecutionResult, Executor};
use crate::errors::CiflowError;
use crate::pipeline::StageSpec;

/// How long to wait for output pipes to drain once the process is gone
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Shell executor
pub struct ShellExecutor;

impl ShellExecutor {
    /// Create a new shell executor
    pub fn new() -> Self {
        Self
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_reader<R>(pipe: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf).await;
        }
        String::from_utf8_lossy(&buf).to_string()
    })
}

async fn drain(handle: JoinHandle<String>) -> String {
    match tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, handle).await {
        Ok(Ok(output)) => output,
        _ => String::new(),
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    // SAFETY: kill(2) with a negative pid signals the group we created at spawn;
    // a stale group id only yields ESRCH.
    let rc = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(pid, error = %std::io::Error::last_os_error(), "process group kill failed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

#[async_trait]
impl Executor for ShellExecutor {
    async fn execute(
        &self,
        stage: &StageSpec,
        working_dir: &Path,
        env: &HashMap<String, String>,
    ) -> Result<ExecutionResult, CiflowError> {
        let start = Instant::now();

        let mut cmd = Command::new(&stage.shell);
        cmd.arg("-c").arg(&stage.command);
        cmd.current_dir(working_dir);
        cmd.envs(env);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| CiflowError::StageSpawn {
            stage: stage.name.clone(),
            error: e.to_string(),
            help: Some(format!("Shell '{}' may not be available", stage.shell)),
        })?;

        let pid = child.id();
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        let (exit_code, timed_out) = match tokio::time::timeout(stage.timeout(), child.wait()).await {
            Ok(Ok(status)) => (status.code(), false),
            Ok(Err(e)) => {
                return Err(CiflowError::StageSpawn {
                    stage: stage.name.clone(),
                    error: e.to_string(),
                    help: None,
                });
            }
            Err(_) => {
                tracing::warn!(
                    stage = %stage.name,
                    timeout_secs = stage.timeout_secs,
                    "stage timed out, killing process group"
                );
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                let _ = child.kill().await;
                (None, true)
            }
        };

        Ok(ExecutionResult {
            exit_code,
            timed_out,
            stdout: drain(stdout).await,
            stderr: drain(stderr).await,
            duration: start.elapsed(),
        })
    }

    async fn check_available(&self, stage: &StageSpec) -> Result<bool, CiflowError> {
        Ok(which::which(&stage.shell).is_ok())
    }

    fn validate_stage(&self, stage: &StageSpec) -> Result<(), CiflowError> {
        if stage.command.trim().is_empty() {
            return Err(CiflowError::InvalidPipeline {
                reason: format!("Stage '{}': command is empty", stage.name),
                help: None,
            });
        }

        if stage.timeout_secs == 0 {
            return Err(CiflowError::InvalidPipeline {
                reason: format!("Stage '{}': timeout_secs must be greater than zero", stage.name),
                help: Some("Use a generous timeout rather than none at all".into()),
            });
        }

        Ok(())
    }
}
