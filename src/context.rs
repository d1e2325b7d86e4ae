// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Per-run state
//!
//! A [`RunContext`] is created by the driver and handed to each component that
//! needs it. Nothing in here is global.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::readiness::EndpointStatus;
use crate::report::{AggregateReport, OverallOutcome};

/// Environment variables consulted for a build id, in order
pub const BUILD_ID_VARS: &[&str] = &["CIFLOW_BUILD_ID", "BUILD_NUMBER", "GITHUB_RUN_ID"];

/// State of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunContext {
    pub pipeline: String,
    pub build_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub committer: Option<String>,
    pub recipient: String,
    pub report: AggregateReport,
    /// Error that aborted the main sequence
    pub fatal: Option<String>,
    pub readiness: Vec<EndpointStatus>,
    /// Stages never started because a mandatory stage failed
    pub skipped_stages: Vec<String>,
}

impl RunContext {
    pub fn new(pipeline: impl Into<String>, build_id: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            build_id: build_id.into(),
            started_at: Utc::now(),
            finished_at: None,
            committer: None,
            recipient: String::new(),
            report: AggregateReport::empty(),
            fatal: None,
            readiness: Vec::new(),
            skipped_stages: Vec::new(),
        }
    }

    /// Verdict of the run; a fatal error always means failure
    pub fn final_outcome(&self) -> OverallOutcome {
        if self.fatal.is_some() {
            OverallOutcome::Failure
        } else {
            self.report.overall_outcome
        }
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        match self.final_outcome() {
            OverallOutcome::Failure => 1,
            OverallOutcome::Success | OverallOutcome::Unstable => 0,
        }
    }

    /// Wall-clock duration, once finished
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Record a fatal error; the first one wins
    pub fn record_fatal(&mut self, error: impl ToString) {
        if self.fatal.is_none() {
            self.fatal = Some(error.to_string());
        }
    }
}

/// Pick a build id: explicit value, then the CI variables, then a random UUID
pub fn resolve_build_id(explicit: Option<&str>) -> String {
    build_id_from(explicit, |key| std::env::var(key).ok())
}

fn build_id_from(explicit: Option<&str>, lookup: impl Fn(&str) -> Option<String>) -> String {
    explicit
        .map(str::to_string)
        .into_iter()
        .chain(BUILD_ID_VARS.iter().filter_map(|key| lookup(*key)))
        .map(|id| id.trim().to_string())
        .find(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
