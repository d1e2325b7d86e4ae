// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Error types
//!
//! Every failure ciflow can report lives in [`CiflowError`]. Whether a variant
//! aborts the run or is only recorded is decided by the orchestrator, see
//! [`CiflowError::is_fatal`].

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for ciflow operations
pub type CiflowResult<T> = Result<T, CiflowError>;

/// Main error type for ciflow
#[derive(Error, Debug, Diagnostic)]
pub enum CiflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Environment Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to materialize config file '{path}': {error}")]
    #[diagnostic(
        code(ciflow::config_write),
        help("Check that the target directory exists and is writable")
    )]
    ConfigWrite { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Stack Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to launch service stack: {reason}")]
    #[diagnostic(code(ciflow::launch_failed))]
    Launch {
        reason: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Readiness Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Endpoint '{endpoint}' not ready after {attempts_made} attempt(s)")]
    #[diagnostic(
        code(ciflow::readiness_timeout),
        help("Increase max_attempts or poll_interval_secs, or check the service logs")
    )]
    ReadinessTimeout {
        endpoint: String,
        attempts_made: u32,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Stage Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Stage '{stage}' failed with exit code {exit_code}")]
    #[diagnostic(code(ciflow::stage_failed))]
    StageFailed {
        stage: String,
        exit_code: i32,
        #[help]
        help: Option<String>,
    },

    #[error("Stage '{stage}' timed out after {}s", .timeout.as_secs())]
    #[diagnostic(
        code(ciflow::stage_timeout),
        help("Raise timeout_secs for this stage if it legitimately needs longer")
    )]
    StageTimeout { stage: String, timeout: Duration },

    #[error("Failed to spawn stage '{stage}': {error}")]
    #[diagnostic(code(ciflow::stage_spawn))]
    StageSpawn {
        stage: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Notification Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to dispatch notification to '{recipient}': {reason}")]
    #[diagnostic(code(ciflow::dispatch_failed))]
    Dispatch { recipient: String, reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Pipeline Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(ciflow::pipeline_not_found),
        help("Create a pipeline with 'ciflow init' or create .ciflow.yaml manually")
    )]
    PipelineNotFound { path: PathBuf },

    #[error("Invalid pipeline configuration: {reason}")]
    #[diagnostic(code(ciflow::invalid_pipeline))]
    InvalidPipeline {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Pipeline run panicked: {message}")]
    #[diagnostic(code(ciflow::panicked))]
    Panicked { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // File Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read file '{path}': {error}")]
    #[diagnostic(code(ciflow::file_read_error))]
    FileReadError { path: PathBuf, error: String },

    #[error("Failed to write file '{path}': {error}")]
    #[diagnostic(code(ciflow::file_write_error))]
    FileWriteError { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(ciflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(ciflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(ciflow::json_error))]
    Json { message: String },

    #[error("TOML parsing error: {message}")]
    #[diagnostic(code(ciflow::toml_error))]
    Toml { message: String },

    #[error("Glob pattern error: {message}")]
    #[diagnostic(code(ciflow::glob_error))]
    GlobPattern { message: String },
}

impl From<std::io::Error> for CiflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for CiflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for CiflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl From<toml::de::Error> for CiflowError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml { message: e.to_string() }
    }
}

impl From<glob::PatternError> for CiflowError {
    fn from(e: glob::PatternError) -> Self {
        Self::GlobPattern { message: e.to_string() }
    }
}

impl CiflowError {
    /// Create a launch error for a container tool that is not on PATH
    pub fn tool_not_found(tool: &str) -> Self {
        let help = match tool {
            "docker" => "Install Docker: https://docs.docker.com/get-docker/".to_string(),
            "podman" => "Install Podman: https://podman.io/docs/installation".to_string(),
            _ => format!("Install {} and ensure it's in your PATH", tool),
        };

        Self::Launch {
            reason: format!("container tool '{}' not found", tool),
            help: Some(help),
        }
    }

    /// Create a launch error from a failed compose invocation
    pub fn launch_failed_with_help(command: &str, exit_code: i32, stderr: &str) -> Self {
        Self::Launch {
            reason: format!("'{}' exited with code {}", command, exit_code),
            help: Self::parse_compose_error(stderr),
        }
    }

    /// Errors that abort the main sequence (finalization still runs)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigWrite { .. } | Self::Launch { .. } | Self::Panicked { .. }
        )
    }

    fn parse_compose_error(stderr: &str) -> Option<String> {
        // Common compose failures and what usually fixes them
        if stderr.contains("port is already allocated") || stderr.contains("address already in use") {
            Some("A port needed by the stack is taken. Stop the conflicting service or container.".into())
        } else if stderr.contains("no space left on device") {
            Some("Disk is full. Enable 'prune: true' on the stack or reclaim space manually.".into())
        } else if stderr.contains("Cannot connect to the Docker daemon") {
            Some("The Docker daemon is not running or this user cannot reach its socket.".into())
        } else if stderr.contains("no such file or directory") {
            Some("The compose file or a build context path does not exist.".into())
        } else {
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            if tail.is_empty() {
                None
            } else {
                Some(tail.into_iter().rev().collect::<Vec<_>>().join("\n"))
            }
        }
    }
}
