// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Service stack lifecycle
//!
//! Starts and stops the multi-container application under test. The
//! [`StackLauncher`] trait is the seam; [`ComposeLauncher`] drives
//! `docker compose` (or any compatible tool).

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::errors::CiflowError;
use crate::pipeline::StackDefinition;

/// Trait for stack launchers
#[async_trait]
pub trait StackLauncher: Send + Sync {
    /// Tear down leftovers, reclaim resources, then start the stack.
    ///
    /// Returns once the start command returns; services may still be
    /// initializing.
    async fn start(&self, stack: &StackDefinition) -> Result<(), CiflowError>;

    /// Stop the stack and remove its containers
    async fn stop(&self, stack: &StackDefinition) -> Result<(), CiflowError>;
}

/// Launcher backed by a compose-compatible CLI
pub struct ComposeLauncher {
    working_dir: PathBuf,
}

impl ComposeLauncher {
    /// Create a launcher running compose commands from `working_dir`
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Arguments shared by every compose invocation
    fn compose_args(stack: &StackDefinition) -> Vec<String> {
        let mut args = Vec::new();

        // `docker compose` vs standalone `docker-compose` / `podman-compose`
        if !is_standalone_compose(&stack.program) {
            args.push("compose".to_string());
        }

        args.push("-f".to_string());
        args.push(stack.compose_file.to_string_lossy().to_string());

        if let Some(ref project) = stack.project {
            args.push("-p".to_string());
            args.push(project.clone());
        }

        args
    }

    fn up_args(stack: &StackDefinition) -> Vec<String> {
        let mut args = Self::compose_args(stack);
        args.push("up".to_string());
        args.push("-d".to_string());
        if stack.build {
            args.push("--build".to_string());
        }
        args
    }

    fn down_args(stack: &StackDefinition) -> Vec<String> {
        let mut args = Self::compose_args(stack);
        args.push("down".to_string());
        args.push("--remove-orphans".to_string());
        if stack.down_volumes {
            args.push("--volumes".to_string());
        }
        args
    }

    /// Run the container tool, killing it once `limit` expires
    async fn run_tool(
        &self,
        program: &Path,
        args: &[String],
        limit: Duration,
    ) -> Result<Output, CiflowError> {
        tracing::debug!(program = %program.display(), args = ?args, ?limit, "running stack command");

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.working_dir)
            .kill_on_drop(true)
            .output();

        match timeout(limit, output).await {
            Ok(result) => result.map_err(|e| CiflowError::Launch {
                reason: format!("failed to run '{}': {}", program.display(), e),
                help: None,
            }),
            Err(_) => Err(CiflowError::Launch {
                reason: format!(
                    "'{} {}' timed out after {}s",
                    program.display(),
                    args.join(" "),
                    limit.as_secs()
                ),
                help: Some("Check the container daemon or raise the stack timeouts".to_string()),
            }),
        }
    }

    fn resolve_program(stack: &StackDefinition) -> Result<PathBuf, CiflowError> {
        which::which(&stack.program).map_err(|_| CiflowError::tool_not_found(&stack.program))
    }

    /// Remove dangling images, stopped containers and unused networks.
    ///
    /// Failures are logged; "nothing to reclaim" is not an error.
    async fn reclaim(&self, program: &Path, stack: &StackDefinition) {
        if is_standalone_compose(&stack.program) {
            return;
        }

        let args = vec!["system".to_string(), "prune".to_string(), "-f".to_string()];
        match self.run_tool(program, &args, stack.down_timeout()).await {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let reclaimed = stdout
                    .lines()
                    .find(|l| l.starts_with("Total reclaimed space"))
                    .unwrap_or("Total reclaimed space: 0B");
                tracing::info!("{}", reclaimed);
            }
            Ok(output) => {
                tracing::warn!(
                    exit_code = output.status.code().unwrap_or(-1),
                    "resource reclamation failed, continuing"
                );
            }
            Err(e) => tracing::warn!(error = %e, "resource reclamation failed, continuing"),
        }
    }
}

fn is_standalone_compose(program: &str) -> bool {
    Path::new(program)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with("-compose"))
}

#[async_trait]
impl StackLauncher for ComposeLauncher {
    async fn start(&self, stack: &StackDefinition) -> Result<(), CiflowError> {
        let program = Self::resolve_program(stack)?;

        // Clean slate: leftovers from a previous run must not linger
        if let Err(e) = self.stop(stack).await {
            tracing::warn!(error = %e, "pre-start teardown failed, continuing");
        }

        if stack.prune {
            self.reclaim(&program, stack).await;
        }

        let args = Self::up_args(stack);
        let output = self.run_tool(&program, &args, stack.up_timeout()).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CiflowError::launch_failed_with_help(
                &format!("{} {}", stack.program, args.join(" ")),
                output.status.code().unwrap_or(-1),
                &stderr,
            ));
        }

        tracing::info!(compose_file = %stack.compose_file.display(), "stack started");
        Ok(())
    }

    async fn stop(&self, stack: &StackDefinition) -> Result<(), CiflowError> {
        let program = Self::resolve_program(stack)?;
        let args = Self::down_args(stack);
        let output = self.run_tool(&program, &args, stack.down_timeout()).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CiflowError::Launch {
                reason: format!(
                    "'{} {}' exited with code {}",
                    stack.program,
                    args.join(" "),
                    output.status.code().unwrap_or(-1)
                ),
                help: Some(stderr.trim().to_string()).filter(|s| !s.is_empty()),
            });
        }

        tracing::info!(compose_file = %stack.compose_file.display(), "stack stopped");
        Ok(())
    }
}
