// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Report command - summarize JUnit XML files

use colored::Colorize;
use miette::Result;
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::OutputFormat;
use crate::report::{self, AggregateReport, StageResult, StageStatus, TestOutcome};
use crate::utils::{outcome_label, print_bullet, print_section, print_warning};

/// Run the report command
pub async fn run(files: Vec<PathBuf>, format: OutputFormat, verbose: bool) -> Result<()> {
    let report = summarize(&files);

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| miette::miette!("Failed to serialize report: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => print_text(&report, verbose),
    }

    Ok(())
}

/// Fold the given files, one pseudo-stage per file
pub fn summarize(files: &[PathBuf]) -> AggregateReport {
    let results: Vec<StageResult> = files
        .iter()
        .map(|path| {
            let parsed = report::parse(path);
            StageResult {
                stage: path.display().to_string(),
                continue_on_failure: true,
                status: StageStatus::Completed,
                exit_code: 0,
                duration_ms: 0,
                test_cases: parsed.cases,
                artifact_paths: BTreeSet::from([path.clone()]),
                warnings: parsed.warning.into_iter().collect(),
            }
        })
        .collect();

    report::fold(&results)
}

fn print_text(report: &AggregateReport, verbose: bool) {
    println!(
        "{} {} total, {} passed, {} failed, {} skipped",
        outcome_label(report.overall_outcome),
        report.total,
        report.passed,
        report.failed,
        report.skipped
    );

    for stage in &report.stages {
        println!(
            "  {} {}",
            stage.name,
            format!("{}/{}/{}", stage.passed, stage.failed, stage.skipped).dimmed()
        );
    }

    let failures: Vec<_> = report
        .details
        .iter()
        .filter(|c| c.outcome == TestOutcome::Failed)
        .collect();
    if !failures.is_empty() {
        print_section("Failed tests");
        for case in failures {
            print_bullet(&format!(
                "{}: {}",
                case.name,
                case.message.as_deref().unwrap_or("no message")
            ));
        }
    }

    if verbose {
        print_section("All tests");
        for case in &report.details {
            print_bullet(&format!("{} [{}]", case.name, case.outcome));
        }
    }

    if !report.warnings.is_empty() {
        println!();
        for warning in &report.warnings {
            print_warning(&warning.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::OverallOutcome;

    #[test]
    fn test_summarize_files() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let good = temp_dir.path().join("http.xml");
        std::fs::write(
            &good,
            r#"<testsuite tests="2"><testcase classname="t" name="a"/><testcase classname="t" name="b"><skipped/></testcase></testsuite>"#,
        )
        .unwrap();
        let missing = temp_dir.path().join("browser.xml");

        let report = summarize(&[good, missing]);

        assert_eq!(report.total, 2);
        assert_eq!(report.passed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.overall_outcome, OverallOutcome::Success);
    }
}
