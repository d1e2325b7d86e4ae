// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Folding stage results into an [`AggregateReport`]

use super::model::{
    AggregateReport, OverallOutcome, StageResult, StageStatus, StageSummary, TestOutcome,
};

/// Fold stage results into one report.
///
/// Pure: the same input always produces the same report. Counts are sums,
/// details keep stage order and, within a stage, report order.
pub fn fold(results: &[StageResult]) -> AggregateReport {
    let mut report = AggregateReport {
        total: 0,
        passed: 0,
        failed: 0,
        skipped: 0,
        details: Vec::new(),
        overall_outcome: OverallOutcome::Success,
        stages: Vec::with_capacity(results.len()),
        warnings: Vec::new(),
    };

    for result in results {
        let passed = result.count(TestOutcome::Passed);
        let failed = result.count(TestOutcome::Failed);
        let skipped = result.count(TestOutcome::Skipped);

        report.passed += passed;
        report.failed += failed;
        report.skipped += skipped;
        report.total += passed + failed + skipped;
        report.details.extend(result.test_cases.iter().cloned());
        report.warnings.extend(result.warnings.iter().cloned());

        report.stages.push(StageSummary {
            name: result.stage.clone(),
            status: result.status,
            exit_code: result.exit_code,
            duration_ms: result.duration_ms,
            passed,
            failed,
            skipped,
            artifact_paths: result.artifact_paths.iter().cloned().collect(),
        });

        debug_assert!(report.is_consistent());
    }

    report.overall_outcome = overall_outcome(results, report.failed);
    report
}

/// Outcome precedence:
///
/// 1. `Failure` when any test case failed, or a mandatory stage went wrong
///    without producing a single test case.
/// 2. `Unstable` when some stage exited non-zero or timed out but nothing
///    above applies.
/// 3. `Success` otherwise.
fn overall_outcome(results: &[StageResult], failed: u32) -> OverallOutcome {
    if failed > 0 || results.iter().any(StageResult::crashed) {
        OverallOutcome::Failure
    } else if results.iter().any(|r| r.status != StageStatus::Completed) {
        OverallOutcome::Unstable
    } else {
        OverallOutcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ParseWarning, TestCaseResult};
    use std::collections::BTreeSet;
    use std::path::{Path, PathBuf};

    fn stage(
        name: &str,
        continue_on_failure: bool,
        status: StageStatus,
        cases: Vec<TestCaseResult>,
    ) -> StageResult {
        StageResult {
            stage: name.into(),
            continue_on_failure,
            status,
            exit_code: match status {
                StageStatus::Completed => 0,
                StageStatus::TimedOut => -1,
                _ => 1,
            },
            duration_ms: 1200,
            test_cases: cases,
            artifact_paths: BTreeSet::from([PathBuf::from(format!("reports/{name}.xml"))]),
            warnings: vec![],
        }
    }

    fn passing(prefix: &str, n: usize) -> Vec<TestCaseResult> {
        (0..n)
            .map(|i| TestCaseResult::passed(format!("{prefix}::test_{i}")))
            .collect()
    }

    #[test]
    fn test_empty_fold() {
        let report = fold(&[]);
        assert_eq!(report.total, 0);
        assert_eq!(report.overall_outcome, OverallOutcome::Success);
        assert!(report.is_consistent());
        assert_eq!(report, AggregateReport::empty());
    }

    #[test]
    fn test_all_green_is_success() {
        let results = vec![
            stage("http", false, StageStatus::Completed, passing("http", 5)),
            stage("browser", true, StageStatus::Completed, passing("browser", 3)),
        ];

        let report = fold(&results);
        assert_eq!(report.total, 8);
        assert_eq!(report.passed, 8);
        assert_eq!(report.overall_outcome, OverallOutcome::Success);
        assert_eq!(report.stages.len(), 2);
        assert_eq!(report.stages[0].artifact_paths, vec![PathBuf::from("reports/http.xml")]);
    }

    #[test]
    fn test_failed_case_in_optional_stage_is_failure() {
        let mut browser = passing("browser", 2);
        browser.push(TestCaseResult::failed("browser::test_login", "element not found"));
        let results = vec![
            stage("http", false, StageStatus::Completed, passing("http", 5)),
            stage("browser", true, StageStatus::Failed, browser),
        ];

        let report = fold(&results);

        assert_eq!(report.total, 8);
        assert_eq!(report.passed, 7);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.overall_outcome, OverallOutcome::Failure);
    }

    #[test]
    fn test_optional_stage_non_zero_without_failures_is_unstable() {
        let results = vec![
            stage("http", false, StageStatus::Completed, passing("http", 5)),
            stage("browser", true, StageStatus::Failed, vec![]),
        ];

        assert_eq!(fold(&results).overall_outcome, OverallOutcome::Unstable);
    }

    #[test]
    fn test_optional_stage_timeout_is_unstable() {
        let results = vec![
            stage("http", false, StageStatus::Completed, passing("http", 1)),
            stage("browser", true, StageStatus::TimedOut, vec![]),
        ];

        assert_eq!(fold(&results).overall_outcome, OverallOutcome::Unstable);
    }

    #[test]
    fn test_mandatory_crash_without_results_is_failure() {
        let results = vec![stage("http", false, StageStatus::Failed, vec![])];

        let report = fold(&results);
        assert_eq!(report.total, 0);
        assert_eq!(report.overall_outcome, OverallOutcome::Failure);
    }

    #[test]
    fn test_mandatory_non_zero_with_only_passing_cases_is_unstable() {
        let results = vec![stage("http", false, StageStatus::Failed, passing("http", 2))];

        assert_eq!(fold(&results).overall_outcome, OverallOutcome::Unstable);
    }

    #[test]
    fn test_skipped_cases_counted() {
        let cases = vec![
            TestCaseResult::passed("a"),
            TestCaseResult::skipped("b", "no browser"),
            TestCaseResult::skipped("c", "no browser"),
        ];
        let report = fold(&[stage("browser", true, StageStatus::Completed, cases)]);

        assert_eq!(report.skipped, 2);
        assert_eq!(report.total, 3);
        assert_eq!(report.overall_outcome, OverallOutcome::Success);
    }

    #[test]
    fn test_details_keep_stage_order() {
        let results = vec![
            stage("http", false, StageStatus::Completed, passing("http", 2)),
            stage("browser", true, StageStatus::Completed, passing("browser", 2)),
        ];

        let names: Vec<_> = fold(&results).details.into_iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec!["http::test_0", "http::test_1", "browser::test_0", "browser::test_1"]
        );
    }

    #[test]
    fn test_fold_is_idempotent() {
        let mut browser = passing("browser", 2);
        browser.push(TestCaseResult::failed("browser::test_vote", "timeout"));
        let mut results = vec![
            stage("http", false, StageStatus::Completed, passing("http", 5)),
            stage("browser", true, StageStatus::Failed, browser),
        ];
        results[1]
            .warnings
            .push(ParseWarning::new(Path::new("reports/extra.xml"), "report file missing"));

        let first = fold(&results);
        let second = fold(&results);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.warnings.len(), 1);
    }

    #[test]
    fn test_counts_consistent_for_every_prefix() {
        let mut mixed = passing("x", 3);
        mixed.push(TestCaseResult::failed("x::f", "boom"));
        mixed.push(TestCaseResult::skipped("x::s", "later"));
        let results = vec![
            stage("one", false, StageStatus::Completed, passing("one", 4)),
            stage("two", true, StageStatus::Failed, mixed),
            stage("three", true, StageStatus::TimedOut, vec![]),
            stage("four", true, StageStatus::Completed, vec![TestCaseResult::skipped("s", "n/a")]),
        ];

        for n in 0..=results.len() {
            let report = fold(&results[..n]);
            assert!(report.is_consistent(), "inconsistent after {n} stages");
        }
    }
}
