// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Stage executors
//!
//! This module provides the executor trait and the shell implementation used
//! to run stage commands as isolated child processes.

mod shell;

pub use shell::ShellExecutor;

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::CiflowError;
use crate::pipeline::StageSpec;

/// Result of running a stage command
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Exit code, `None` when killed by a signal or on timeout
    pub exit_code: Option<i32>,

    /// The process exceeded its timeout and was killed
    pub timed_out: bool,

    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Execution duration
    pub duration: Duration,
}

impl ExecutionResult {
    /// Whether the command exited zero within its timeout
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Last `n` lines of stderr, for diagnostics
    pub fn stderr_tail(&self, n: usize) -> String {
        let lines: Vec<&str> = self.stderr.lines().rev().take(n).collect();
        lines.into_iter().rev().collect::<Vec<_>>().join("\n")
    }
}

/// Trait for stage executors
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run a stage command to completion or until its timeout.
    ///
    /// A non-zero exit or a timeout is reported in the result; `Err` means
    /// the command could not be started at all.
    ///
    /// # Arguments
    /// * `stage` - The stage configuration
    /// * `working_dir` - The working directory for execution
    /// * `env` - Environment variables
    async fn execute(
        &self,
        stage: &StageSpec,
        working_dir: &Path,
        env: &HashMap<String, String>,
    ) -> Result<ExecutionResult, CiflowError>;

    /// Check that the stage's interpreter is available
    async fn check_available(&self, stage: &StageSpec) -> Result<bool, CiflowError>;

    /// Validate stage configuration
    fn validate_stage(&self, stage: &StageSpec) -> Result<(), CiflowError>;
}

/// Resolve report glob patterns to existing files.
///
/// Returns the matched files and the patterns that matched nothing.
pub fn resolve_reports(
    patterns: &[String],
    base_dir: &Path,
) -> Result<(BTreeSet<PathBuf>, Vec<String>), CiflowError> {
    let mut files = BTreeSet::new();
    let mut unmatched = Vec::new();

    for pattern in patterns {
        let full_pattern = if Path::new(pattern).is_absolute() {
            pattern.to_string()
        } else {
            base_dir.join(pattern).to_string_lossy().to_string()
        };

        let matches: Vec<_> = glob::glob(&full_pattern)?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();

        if matches.is_empty() {
            unmatched.push(pattern.clone());
        }

        files.extend(matches);
    }

    Ok((files, unmatched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_reports() {
        let temp_dir = TempDir::new().unwrap();
        let reports = temp_dir.path().join("reports");
        std::fs::create_dir_all(&reports).unwrap();
        std::fs::write(reports.join("http.xml"), "<testsuite/>").unwrap();
        std::fs::write(reports.join("browser.xml"), "<testsuite/>").unwrap();

        let patterns = vec!["reports/*.xml".to_string(), "missing/*.xml".to_string()];
        let (files, unmatched) = resolve_reports(&patterns, temp_dir.path()).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "xml"));
        assert_eq!(unmatched, vec!["missing/*.xml"]);
    }

    #[test]
    fn test_invalid_pattern() {
        let err = resolve_reports(&["reports/[.xml".to_string()], Path::new(".")).unwrap_err();
        assert!(matches!(err, CiflowError::GlobPattern { .. }));
    }

    #[test]
    fn test_stderr_tail() {
        let result = ExecutionResult {
            exit_code: Some(1),
            timed_out: false,
            stdout: String::new(),
            stderr: "a\nb\nc\nd".into(),
            duration: Duration::from_millis(5),
        };

        assert!(!result.success());
        assert_eq!(result.stderr_tail(2), "c\nd");
    }
}
