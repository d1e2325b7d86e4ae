// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Stage runner
//!
//! Runs the configured stages one after another. A mandatory stage that does
//! not complete stops the sequence; optional stages are recorded and the run
//! moves on. Either way control returns to the caller.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Instant;

use colored::Colorize;

use crate::errors::CiflowError;
use crate::executors::{resolve_reports, Executor};
use crate::pipeline::StageSpec;
use crate::report::{self, ParseWarning, StageResult, StageStatus};

/// Stage runner options
#[derive(Debug, Clone, Default)]
pub struct RunnerOptions {
    /// Print stderr of failed stages
    pub verbose: bool,
    /// Suppress progress lines
    pub quiet: bool,
}

/// Results of a stage sequence
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Results of stages that ran, in order
    pub results: Vec<StageResult>,
    /// Stages without a result
    pub skipped: Vec<String>,
}

impl RunOutcome {
    /// Nothing has run yet; every stage counts as skipped
    pub fn pending(stages: &[StageSpec]) -> Self {
        Self {
            results: Vec::new(),
            skipped: stages.iter().map(|s| s.name.clone()).collect(),
        }
    }
}

/// Sequential stage runner
pub struct StageRunner {
    executor: Box<dyn Executor>,
    working_dir: PathBuf,
    env: HashMap<String, String>,
    options: RunnerOptions,
}

impl StageRunner {
    /// Create a runner executing stages from `working_dir`
    pub fn new(executor: Box<dyn Executor>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            working_dir: working_dir.into(),
            env: HashMap::new(),
            options: RunnerOptions::default(),
        }
    }

    /// Global environment, overridden per stage
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_options(mut self, options: RunnerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Run all stages in order, short-circuiting on a failed mandatory stage
    pub async fn run_all(&self, stages: &[StageSpec]) -> RunOutcome {
        let mut outcome = RunOutcome::pending(stages);
        self.run_all_into(stages, &mut outcome).await;
        outcome
    }

    /// Like [`StageRunner::run_all`], recording each result as soon as its
    /// stage finishes so the caller keeps them if a later stage aborts
    pub async fn run_all_into(&self, stages: &[StageSpec], outcome: &mut RunOutcome) {
        outcome.results.clear();
        outcome.skipped = stages.iter().map(|s| s.name.clone()).collect();

        self.print_plan(stages);

        for (idx, stage) in stages.iter().enumerate() {
            let result = self.run_stage(stage).await;
            let halted = stage.is_mandatory() && result.status != StageStatus::Completed;
            outcome.results.push(result);
            outcome.skipped = stages[idx + 1..].iter().map(|s| s.name.clone()).collect();

            if halted {
                if !outcome.skipped.is_empty() {
                    tracing::warn!(
                        stage = %stage.name,
                        skipped = ?outcome.skipped,
                        "mandatory stage failed, skipping remaining stages"
                    );
                }
                break;
            }
        }
    }

    /// Run one stage: Pending → Running → Completed | Failed | TimedOut
    pub async fn run_stage(&self, stage: &StageSpec) -> StageResult {
        tracing::debug!(stage = %stage.name, status = %StageStatus::Pending, "stage queued");

        // Merge environments (stage overrides global)
        let mut env = self.env.clone();
        env.extend(stage.env.clone());

        // Reports left over from an earlier run must not count for this one
        let stale = self.clear_reports(stage);

        if !self.options.quiet {
            print!("  {} {}...", "→".blue(), stage.name);
        }
        tracing::info!(stage = %stage.name, status = %StageStatus::Running, "stage started");

        let start = Instant::now();
        let execution = self.executor.execute(stage, &self.working_dir, &env).await;

        let (status, exit_code, stderr) = match execution {
            Ok(ref result) if result.timed_out => (StageStatus::TimedOut, -1, result.stderr_tail(20)),
            Ok(ref result) if result.success() => (StageStatus::Completed, 0, String::new()),
            Ok(ref result) => (
                StageStatus::Failed,
                result.exit_code.unwrap_or(-1),
                result.stderr_tail(20),
            ),
            Err(ref e) => (StageStatus::Failed, -1, e.to_string()),
        };
        let duration_ms = execution
            .as_ref()
            .map(|r| r.duration)
            .unwrap_or_else(|_| start.elapsed())
            .as_millis() as u64;

        let failure = match status {
            StageStatus::Failed => Some(CiflowError::StageFailed {
                stage: stage.name.clone(),
                exit_code,
                help: (!stderr.is_empty()).then(|| stderr.clone()),
            }),
            StageStatus::TimedOut => Some(CiflowError::StageTimeout {
                stage: stage.name.clone(),
                timeout: stage.timeout(),
            }),
            _ => None,
        };
        if let Some(e) = failure {
            if stage.is_mandatory() {
                tracing::error!(error = %e, "mandatory stage did not complete");
            } else {
                tracing::warn!(error = %e, "optional stage did not complete, continuing");
            }
        }

        let (test_cases, artifact_paths, warnings) = self.collect_reports(stage, &stale);

        tracing::info!(
            stage = %stage.name,
            status = %status,
            exit_code,
            duration_ms,
            cases = test_cases.len(),
            "stage finished"
        );

        self.print_result(stage, status, duration_ms, &stderr);

        StageResult {
            stage: stage.name.clone(),
            continue_on_failure: stage.continue_on_failure,
            status,
            exit_code,
            duration_ms,
            test_cases,
            artifact_paths,
            warnings,
        }
    }

    /// Delete files matching the stage's report patterns.
    ///
    /// Returns the files that could not be removed.
    fn clear_reports(&self, stage: &StageSpec) -> BTreeSet<PathBuf> {
        let Ok((paths, _)) = resolve_reports(&stage.reports, &self.working_dir) else {
            return BTreeSet::new();
        };

        paths
            .into_iter()
            .filter(|path| match std::fs::remove_file(path) {
                Ok(()) => {
                    tracing::debug!(
                        stage = %stage.name,
                        path = %path.display(),
                        "removed previous report"
                    );
                    false
                }
                Err(e) => {
                    tracing::warn!(
                        stage = %stage.name,
                        path = %path.display(),
                        error = %e,
                        "cannot remove previous report"
                    );
                    true
                }
            })
            .collect()
    }

    /// Parse the reports the stage wrote, ignoring `stale` leftovers
    fn collect_reports(
        &self,
        stage: &StageSpec,
        stale: &BTreeSet<PathBuf>,
    ) -> (
        Vec<report::TestCaseResult>,
        BTreeSet<PathBuf>,
        Vec<ParseWarning>,
    ) {
        let mut cases = Vec::new();
        let mut warnings = Vec::new();

        let (paths, unmatched) = match resolve_reports(&stage.reports, &self.working_dir) {
            Ok(found) => found,
            Err(e) => {
                warnings.push(ParseWarning::new(&self.working_dir, e.to_string()));
                return (cases, Default::default(), warnings);
            }
        };

        for pattern in unmatched {
            let warning = ParseWarning::new(Path::new(&pattern), "report file missing");
            tracing::warn!(stage = %stage.name, %warning, "expected report not found");
            warnings.push(warning);
        }

        let (stale_paths, paths): (BTreeSet<PathBuf>, BTreeSet<PathBuf>) =
            paths.into_iter().partition(|p| stale.contains(p));
        for path in &stale_paths {
            let warning = ParseWarning::new(path, "report predates this run, ignored");
            tracing::warn!(stage = %stage.name, %warning, "stale report ignored");
            warnings.push(warning);
        }

        for path in &paths {
            let parsed = report::parse(path);
            cases.extend(parsed.cases);
            warnings.extend(parsed.warning);
        }

        let artifacts = paths
            .into_iter()
            .map(|p| {
                p.strip_prefix(&self.working_dir)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| p.clone())
            })
            .collect();

        (cases, artifacts, warnings)
    }

    fn print_plan(&self, stages: &[StageSpec]) {
        if self.options.quiet {
            return;
        }

        println!();
        println!(
            "Execution plan ({} stage{}):",
            stages.len(),
            if stages.len() == 1 { "" } else { "s" }
        );
        for (i, stage) in stages.iter().enumerate() {
            print!("  {}. {}", i + 1, stage.name.bold());
            if stage.continue_on_failure {
                print!(" {}", "[continue on failure]".dimmed());
            }
            println!();
        }
        println!();
    }

    fn print_result(&self, stage: &StageSpec, status: StageStatus, duration_ms: u64, stderr: &str) {
        if self.options.quiet {
            return;
        }

        let secs = duration_ms as f64 / 1000.0;
        match status {
            StageStatus::Completed => {
                println!("\r  {} {} ({:.2}s)", "✓".green(), stage.name.bold(), secs);
            }
            StageStatus::TimedOut => {
                println!(
                    "\r  {} {} timed out after {}s",
                    "✗".red(),
                    stage.name.bold(),
                    stage.timeout_secs
                );
            }
            _ => {
                println!("\r  {} {} failed ({:.2}s)", "✗".red(), stage.name.bold(), secs);
            }
        }

        if self.options.verbose && !stderr.is_empty() {
            eprintln!("{}", stderr.dimmed());
        }
    }
}
