// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Result data model shared by the stage runner, the aggregator and the
//! notifier.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Outcome of a single test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Passed,
    Failed,
    Skipped,
}

impl std::fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "passed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// One test case parsed from a stage report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub name: String,
    pub outcome: TestOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TestCaseResult {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: TestOutcome::Passed,
            message: None,
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: TestOutcome::Failed,
            message: Some(message.into()),
        }
    }

    pub fn skipped(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: TestOutcome::Skipped,
            message: Some(message.into()),
        }
    }
}

/// A report that could not be used; contributes zero counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl ParseWarning {
    pub fn new(path: &Path, reason: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}

/// Result of parsing one report file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub cases: Vec<TestCaseResult>,
    pub warning: Option<ParseWarning>,
}

impl ParseOutcome {
    pub fn warn(path: &Path, reason: impl Into<String>) -> Self {
        let warning = ParseWarning::new(path, reason);
        tracing::warn!(%warning, "ignoring unusable test report");
        Self {
            cases: vec![],
            warning: Some(warning),
        }
    }
}

/// Terminal state of a stage (`Pending` and `Running` are transient)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Everything known about a finished stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: String,
    pub continue_on_failure: bool,
    pub status: StageStatus,
    /// `-1` when the process was killed or never started
    pub exit_code: i32,
    pub duration_ms: u64,
    pub test_cases: Vec<TestCaseResult>,
    pub artifact_paths: BTreeSet<PathBuf>,
    pub warnings: Vec<ParseWarning>,
}

impl StageResult {
    pub fn is_mandatory(&self) -> bool {
        !self.continue_on_failure
    }

    /// Mandatory stage that went wrong without producing anything to count
    pub fn crashed(&self) -> bool {
        self.is_mandatory() && self.status != StageStatus::Completed && self.test_cases.is_empty()
    }

    pub fn count(&self, outcome: TestOutcome) -> u32 {
        self.test_cases
            .iter()
            .filter(|c| c.outcome == outcome)
            .count() as u32
    }
}

/// Verdict of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallOutcome {
    Success,
    Unstable,
    Failure,
}

impl std::fmt::Display for OverallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Unstable => write!(f, "UNSTABLE"),
            Self::Failure => write!(f, "FAILURE"),
        }
    }
}

/// Per-stage row of the aggregate report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    pub name: String,
    pub status: StageStatus,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub artifact_paths: Vec<PathBuf>,
}

/// Folded view over all stage results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
    pub details: Vec<TestCaseResult>,
    pub overall_outcome: OverallOutcome,
    pub stages: Vec<StageSummary>,
    pub warnings: Vec<ParseWarning>,
}

impl AggregateReport {
    /// Report for a run in which no stage ran
    pub fn empty() -> Self {
        super::fold(&[])
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.passed + self.failed + self.skipped
            && self.total as usize == self.details.len()
    }
}

impl Default for AggregateReport {
    fn default() -> Self {
        Self::empty()
    }
}
