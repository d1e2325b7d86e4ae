// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Pipeline driver
//!
//! Runs the linear sequence
//!
//! ```text
//! materialize config → launch stack → await endpoints → run stages → fold
//! ```
//!
//! and then, no matter how far that got, a finalization phase that tears the
//! stack down and sends exactly one notification. Errors and panics in the
//! main sequence are recorded on the [`RunContext`] as fatal.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use futures::FutureExt;

use crate::context::RunContext;
use crate::environment;
use crate::errors::{CiflowError, RecoverySuggestion};
use crate::executors::{Executor, ShellExecutor};
use crate::notify::{self, dispatcher_for, Dispatcher};
use crate::pipeline::{Pipeline, RunOutcome, RunnerOptions, StackDefinition, StageRunner};
use crate::readiness::{self, EndpointProbe, Probe};
use crate::report;
use crate::stack::{ComposeLauncher, StackLauncher};
use crate::utils::{create_spinner, print_success, print_warning};

/// Orchestrator options
#[derive(Debug, Clone, Default)]
pub struct OrchestratorOptions {
    /// Assume the stack is already up; neither start nor stop it
    pub skip_launch: bool,
    pub runner: RunnerOptions,
}

/// Drives one pipeline run from start to notification
pub struct Orchestrator {
    pipeline: Pipeline,
    working_dir: PathBuf,
    launcher: Box<dyn StackLauncher>,
    probe: Box<dyn Probe>,
    runner: StageRunner,
    dispatcher: Box<dyn Dispatcher>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    /// Wire up an orchestrator from explicit components
    pub fn new(
        pipeline: Pipeline,
        working_dir: impl Into<PathBuf>,
        launcher: Box<dyn StackLauncher>,
        probe: Box<dyn Probe>,
        executor: Box<dyn Executor>,
        dispatcher: Box<dyn Dispatcher>,
        options: OrchestratorOptions,
    ) -> Self {
        let working_dir = working_dir.into();
        let runner = StageRunner::new(executor, &working_dir)
            .with_env(pipeline.env.clone())
            .with_options(options.runner.clone());

        Self {
            pipeline,
            working_dir,
            launcher,
            probe,
            runner,
            dispatcher,
            options,
        }
    }

    /// Orchestrator using compose, network probes, the shell and the configured sink
    pub fn with_defaults(
        pipeline: Pipeline,
        working_dir: &Path,
        build_id: &str,
        options: OrchestratorOptions,
    ) -> Self {
        let dispatcher = dispatcher_for(&pipeline.notify, working_dir, build_id);
        Self::new(
            pipeline,
            working_dir,
            Box::new(ComposeLauncher::new(working_dir)),
            Box::new(EndpointProbe::new()),
            Box::new(ShellExecutor::new()),
            dispatcher,
            options,
        )
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run the pipeline and finalize; the verdict ends up in `ctx`
    pub async fn run(&self, ctx: &mut RunContext) {
        tracing::info!(pipeline = %self.pipeline.name, build_id = %ctx.build_id, "pipeline started");

        // Lives outside the unwind boundary so finished stages survive a panic
        let mut stages = RunOutcome::pending(&self.pipeline.stages);
        let outcome = AssertUnwindSafe(self.main_sequence(ctx, &mut stages))
            .catch_unwind()
            .await;

        ctx.skipped_stages = stages.skipped;
        ctx.report = report::fold(&stages.results);

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                if e.is_fatal() {
                    tracing::error!(error = %e, "pipeline aborted");
                } else {
                    tracing::error!(error = %e, "pipeline aborted by unexpected error");
                }
                if let Some(suggestion) = RecoverySuggestion::for_error(&e) {
                    tracing::info!(suggestion = %suggestion.action, "recovery hint");
                }
                ctx.record_fatal(e);
            }
            Err(panic) => {
                let e = CiflowError::Panicked {
                    message: panic_message(&*panic),
                };
                tracing::error!(error = %e, "pipeline aborted");
                ctx.record_fatal(e);
            }
        }

        self.finalize(ctx).await;

        tracing::info!(
            pipeline = %self.pipeline.name,
            outcome = %ctx.final_outcome(),
            total = ctx.report.total,
            failed = ctx.report.failed,
            "pipeline finished"
        );
    }

    async fn main_sequence(
        &self,
        ctx: &mut RunContext,
        stages: &mut RunOutcome,
    ) -> Result<(), CiflowError> {
        for (path, outcome) in environment::materialize_all(&self.pipeline.config_files, &self.working_dir)? {
            tracing::debug!(path = %path.display(), ?outcome, "config file ready");
        }

        if let Some(stack) = self.managed_stack() {
            self.launcher.start(stack).await?;
        }

        ctx.readiness = self.await_endpoints().await;

        self.runner.run_all_into(&self.pipeline.stages, stages).await;

        Ok(())
    }

    async fn await_endpoints(&self) -> Vec<readiness::EndpointStatus> {
        if self.pipeline.endpoints.is_empty() {
            return Vec::new();
        }

        let quiet = self.options.runner.quiet;
        let spinner = (!quiet).then(|| {
            create_spinner(&format!(
                "Waiting for {} service(s)...",
                self.pipeline.endpoints.len()
            ))
        });

        let statuses = readiness::await_all(&self.pipeline.endpoints, self.probe.as_ref()).await;

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        if !quiet {
            for status in &statuses {
                let line = format!("{} ({})", status.name, status.url);
                if status.ready {
                    print_success(&line);
                } else {
                    print_warning(&format!("{} not ready after {} attempts", line, status.attempts));
                }
            }
        }

        statuses
    }

    /// Always runs, exactly once per [`Orchestrator::run`]
    async fn finalize(&self, ctx: &mut RunContext) {
        if let Some(stack) = self.managed_stack() {
            if let Err(e) = self.launcher.stop(stack).await {
                tracing::warn!(error = %e, "stack teardown failed");
            }
        }

        ctx.finish();
        ctx.recipient = notify::resolve_recipient(
            Some(ctx.recipient.as_str()),
            &self.pipeline.notify.default_recipient,
        );

        let document = notify::render(ctx, &self.pipeline.notify);
        if let Err(e) = self.dispatcher.dispatch(&ctx.recipient, &document).await {
            tracing::warn!(error = %e, "notification not delivered");
        }
    }

    fn managed_stack(&self) -> Option<&StackDefinition> {
        if self.options.skip_launch {
            None
        } else {
            self.pipeline.stack.as_ref()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
