// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Build notifications
//!
//! [`render`] turns a finished [`RunContext`] into a plain-text [`Document`].
//! It does no I/O, so the same context always renders the same text. Delivery
//! is the job of a [`Dispatcher`].

mod dispatch;

pub use dispatch::{dispatcher_for, CommandDispatcher, Dispatcher, OutboxDispatcher};

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::context::RunContext;
use crate::pipeline::NotifyConfig;
use crate::report::TestOutcome;

/// A rendered notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub subject: String,
    pub body: String,
}

/// Render the notification for a run
pub fn render(ctx: &RunContext, config: &NotifyConfig) -> Document {
    let report = &ctx.report;
    let outcome = ctx.final_outcome();

    let subject = format!(
        "{} {} #{}: {} ({}/{} passed)",
        config.subject_prefix, ctx.pipeline, ctx.build_id, outcome, report.passed, report.total
    );

    let mut lines = vec![
        format!("Pipeline: {}", ctx.pipeline),
        format!("Build: {}", ctx.build_id),
        format!("Outcome: {}", outcome),
        format!("Started: {}", ctx.started_at.format("%Y-%m-%d %H:%M:%S UTC")),
        format!(
            "Duration: {}",
            ctx.duration()
                .map(|d| format!("{}s", d.num_seconds()))
                .unwrap_or_else(|| "unknown".to_string())
        ),
        format!("Committer: {}", ctx.committer.as_deref().unwrap_or("unknown")),
    ];

    if let Some(fatal) = &ctx.fatal {
        lines.push(format!("Fatal error: {}", fatal));
    }

    if !ctx.readiness.is_empty() {
        lines.push(String::new());
        lines.push("Services:".to_string());
        for status in &ctx.readiness {
            lines.push(format!(
                "- {} {}: {} after {} attempt(s)",
                status.name,
                status.url,
                if status.ready { "ready" } else { "NOT READY" },
                status.attempts
            ));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Tests: {} total, {} passed, {} failed, {} skipped",
        report.total, report.passed, report.failed, report.skipped
    ));

    if !report.stages.is_empty() {
        lines.push(String::new());
        lines.push("Stages:".to_string());
        for stage in &report.stages {
            lines.push(format!(
                "- {}: {} (exit {}, {:.2}s) {} passed, {} failed, {} skipped",
                stage.name,
                stage.status,
                stage.exit_code,
                stage.duration_ms as f64 / 1000.0,
                stage.passed,
                stage.failed,
                stage.skipped
            ));
        }
    }

    for (outcome, title) in [
        (TestOutcome::Failed, "Failed tests:"),
        (TestOutcome::Skipped, "Skipped tests:"),
        (TestOutcome::Passed, "Passed tests:"),
    ] {
        let cases: Vec<_> = report.details.iter().filter(|c| c.outcome == outcome).collect();
        if cases.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(title.to_string());
        for case in cases {
            match &case.message {
                Some(message) if outcome != TestOutcome::Passed => {
                    lines.push(format!("- {}: {}", case.name, message))
                }
                _ => lines.push(format!("- {}", case.name)),
            }
        }
    }

    push_section(&mut lines, "Stages not run:", ctx.skipped_stages.iter().cloned());
    push_section(
        &mut lines,
        "Warnings:",
        report.warnings.iter().map(ToString::to_string),
    );
    push_section(
        &mut lines,
        "Artifacts:",
        report
            .stages
            .iter()
            .flat_map(|s| s.artifact_paths.iter())
            .map(|p| artifact_link(config.artifact_base_url.as_deref(), p)),
    );

    Document {
        subject,
        body: lines.join("\n"),
    }
}

fn push_section(lines: &mut Vec<String>, title: &str, items: impl Iterator<Item = String>) {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        return;
    }
    lines.push(String::new());
    lines.push(title.to_string());
    lines.extend(items.into_iter().map(|item| format!("- {}", item)));
}

fn artifact_link(base_url: Option<&str>, path: &Path) -> String {
    match base_url {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), path.display()),
        None => path.display().to_string(),
    }
}

/// Trimmed `candidate` if it holds anything, else `default`
pub fn resolve_recipient(candidate: Option<&str>, default: &str) -> String {
    candidate
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Best guess at who triggered the build: `env_var`, then the last commit's author
pub async fn lookup_committer(env_var: &str, checkout: &Path) -> Option<String> {
    if let Some(email) = std::env::var(env_var).ok().filter(|v| !v.trim().is_empty()) {
        return Some(email.trim().to_string());
    }

    let output = tokio::process::Command::new("git")
        .args(["log", "-1", "--format=%ae"])
        .current_dir(checkout)
        .output()
        .await
        .map_err(|e| tracing::debug!(error = %e, "git not available for committer lookup"))
        .ok()?;

    if !output.status.success() {
        tracing::debug!(checkout = %checkout.display(), "not a git checkout, no committer");
        return None;
    }

    let email = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!email.is_empty()).then_some(email)
}

/// Outbox file name for a document
pub(crate) fn outbox_file_name(build_id: &str) -> PathBuf {
    let safe: String = build_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    PathBuf::from(format!("ciflow-{}.eml", safe))
}
