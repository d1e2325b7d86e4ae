// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Run command - execute the pipeline

use colored::Colorize;
use miette::Result;
use std::path::{Path, PathBuf};

use super::{load_pipeline, pipeline_base_dir};
use crate::context::{resolve_build_id, RunContext};
use crate::errors::CiflowError;
use crate::executors::{Executor, ShellExecutor};
use crate::notify::{lookup_committer, resolve_recipient};
use crate::pipeline::{Orchestrator, OrchestratorOptions, PipelineValidator, RunnerOptions};
use crate::utils::{outcome_label, print_header, print_warning};

/// Run the pipeline; returns the process exit code
pub async fn run(
    pipeline_path: PathBuf,
    build_id: Option<String>,
    recipient: Option<String>,
    summary: Option<PathBuf>,
    skip_launch: bool,
    verbose: bool,
) -> Result<i32> {
    let pipeline = load_pipeline(&pipeline_path)?;

    // Validate pipeline
    let validation = PipelineValidator::validate(&pipeline);

    if !validation.is_valid() {
        eprintln!("{}", "Pipeline validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Pipeline configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    // Missing shells are reported now; the stage itself fails later
    let shell = ShellExecutor::new();
    for stage in &pipeline.stages {
        if !shell.check_available(stage).await.unwrap_or(false) {
            print_warning(&format!(
                "Stage '{}': shell '{}' not found on PATH",
                stage.name, stage.shell
            ));
        }
    }

    // Stages, config files and reports resolve against the pipeline's directory
    let working_dir = pipeline_base_dir(&pipeline_path)?;

    let mut ctx = RunContext::new(pipeline.name.clone(), resolve_build_id(build_id.as_deref()));
    ctx.committer = lookup_committer(&pipeline.notify.recipient_env, &working_dir).await;
    let explicit = recipient.as_deref().map(str::trim).filter(|r| !r.is_empty());
    ctx.recipient = resolve_recipient(
        explicit.or(ctx.committer.as_deref()),
        &pipeline.notify.default_recipient,
    );

    print_header(&format!("ciflow: {} (build {})", pipeline.name, ctx.build_id));

    let options = OrchestratorOptions {
        skip_launch,
        runner: RunnerOptions {
            verbose,
            quiet: false,
        },
    };
    let orchestrator = Orchestrator::with_defaults(pipeline, &working_dir, &ctx.build_id, options);
    orchestrator.run(&mut ctx).await;

    print_outcome(&ctx);

    if let Some(path) = summary {
        write_summary(&ctx, &path)?;
        println!("Summary written to {}", path.display().to_string().cyan());
    }

    Ok(ctx.exit_code())
}

fn print_outcome(ctx: &RunContext) {
    let report = &ctx.report;

    println!();
    println!(
        "{} {} total, {} passed, {} failed, {} skipped",
        outcome_label(ctx.final_outcome()),
        report.total,
        report.passed.to_string().green(),
        report.failed.to_string().red(),
        report.skipped.to_string().yellow()
    );

    if !ctx.skipped_stages.is_empty() {
        println!("  Not run: {}", ctx.skipped_stages.join(", ").dimmed());
    }
    for warning in &report.warnings {
        print_warning(&warning.to_string());
    }
    if let Some(fatal) = &ctx.fatal {
        eprintln!("{} {}", "Fatal:".red().bold(), fatal);
    }
    println!("  Notification sent to {}", ctx.recipient.cyan());
}

/// Write the finished run context as pretty JSON
pub fn write_summary(ctx: &RunContext, path: &Path) -> Result<(), CiflowError> {
    let json = serde_json::to_string_pretty(ctx)?;
    std::fs::write(path, json).map_err(|e| CiflowError::FileWriteError {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_summary() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("summary.json");
        let mut ctx = RunContext::new("liveqa", "42");
        ctx.recipient = "ci@localhost".into();

        write_summary(&ctx, &path).unwrap();

        let parsed: RunContext =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, ctx);
    }

    #[test]
    fn test_write_summary_to_missing_dir() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("missing/summary.json");

        let err = write_summary(&RunContext::new("liveqa", "42"), &path).unwrap_err();
        assert!(matches!(err, CiflowError::FileWriteError { .. }));
    }
}
