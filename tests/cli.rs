// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn ciflow(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ciflow").unwrap();
    cmd.arg("-C")
        .arg(dir)
        .env("NO_COLOR", "1")
        .env("GIT_COMMITTER_EMAIL", "dev@example.com")
        .env_remove("CIFLOW_BUILD_ID")
        .env_remove("CIFLOW_RECIPIENT")
        .env_remove("RUST_LOG");
    cmd
}

const PASSING_REPORT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<testsuites>
  <testsuite name="pytest" tests="2" failures="0">
    <testcase classname="tests.test_http_simple" name="test_frontend" time="0.1"/>
    <testcase classname="tests.test_http_simple" name="test_graphql" time="0.2"/>
  </testsuite>
</testsuites>
"#;

fn write_pipeline(dir: &Path, stages: &str) {
    let pipeline = format!(
        "name: liveqa\nstages:\n{}\nnotify:\n  sink:\n    type: outbox\n    dir: outbox\n",
        stages
    );
    std::fs::write(dir.join(".ciflow.yaml"), pipeline).unwrap();
}

#[test]
fn test_report_json() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("http.xml"), PASSING_REPORT).unwrap();

    ciflow(temp_dir.path())
        .args(["report", "http.xml", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total\": 2"))
        .stdout(predicate::str::contains("tests.test_http_simple::test_graphql"));
}

#[test]
fn test_init_never_overwrites() {
    let temp_dir = TempDir::new().unwrap();

    ciflow(temp_dir.path()).arg("init").assert().success();
    assert!(temp_dir.path().join(".ciflow.yaml").exists());

    ciflow(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    ciflow(temp_dir.path()).args(["init", "--force"]).assert().success();
}

#[test]
fn test_validate() {
    let temp_dir = TempDir::new().unwrap();
    write_pipeline(
        temp_dir.path(),
        "  - name: http\n    command: \"true\"\n    reports: [reports/http.xml]",
    );

    ciflow(temp_dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline is valid!"));
}

#[test]
fn test_validate_rejects_empty_pipeline() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join(".ciflow.yaml"), "name: empty\nstages: []\n").unwrap();

    ciflow(temp_dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("no stages"));
}

#[test]
fn test_validate_missing_pipeline() {
    let temp_dir = TempDir::new().unwrap();

    ciflow(temp_dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_run_success_writes_notification() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::create_dir(temp_dir.path().join("reports")).unwrap();
    std::fs::write(temp_dir.path().join("fixture.xml"), PASSING_REPORT).unwrap();
    write_pipeline(
        temp_dir.path(),
        "  - name: http\n    command: \"cp fixture.xml reports/http.xml\"\n    reports: [reports/http.xml]",
    );

    ciflow(temp_dir.path())
        .args(["run", "--build-id", "9", "--summary", "summary.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SUCCESS"));

    let message = std::fs::read_to_string(temp_dir.path().join("outbox/ciflow-9.eml")).unwrap();
    assert!(message.contains("To: dev@example.com"));
    assert!(message.contains("Tests: 2 total, 2 passed, 0 failed, 0 skipped"));

    let summary = std::fs::read_to_string(temp_dir.path().join("summary.json")).unwrap();
    assert!(summary.contains("\"overall_outcome\": \"success\""));
}

#[test]
fn test_run_mandatory_failure_exits_non_zero() {
    let temp_dir = TempDir::new().unwrap();
    write_pipeline(
        temp_dir.path(),
        "  - name: http\n    command: \"exit 3\"\n  - name: browser\n    command: \"touch browser-ran\"\n    continue_on_failure: true",
    );

    ciflow(temp_dir.path())
        .args(["run", "--build-id", "10", "--recipient", "  "])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAILURE"));

    assert!(!temp_dir.path().join("browser-ran").exists());
    let message = std::fs::read_to_string(temp_dir.path().join("outbox/ciflow-10.eml")).unwrap();
    assert!(message.contains("Stages not run:"));
    // A blank flag falls back to the committer
    assert!(message.contains("To: dev@example.com"));
}

#[test]
fn test_pipeline_in_subdirectory_resolves_paths_from_its_directory() {
    let temp_dir = TempDir::new().unwrap();
    let sub = temp_dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();
    std::fs::write(sub.join(".env.example"), "API_URL=http://localhost:3000\n").unwrap();
    std::fs::write(
        sub.join(".ciflow.yaml"),
        "name: liveqa\nconfig_files:\n  - path: .env\n    from: .env.example\nstages:\n  - name: http\n    command: \"test -f .env\"\nnotify:\n  sink:\n    type: outbox\n    dir: outbox\n",
    )
    .unwrap();

    ciflow(temp_dir.path())
        .args(["validate", "sub/.ciflow.yaml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Missing files").not());

    ciflow(temp_dir.path())
        .args(["run", "-p", "sub/.ciflow.yaml", "--build-id", "11"])
        .assert()
        .success();

    assert!(sub.join(".env").exists());
    assert!(!temp_dir.path().join(".env").exists());
    assert!(sub.join("outbox/ciflow-11.eml").exists());
}
