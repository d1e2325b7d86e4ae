// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Init command - write a starter pipeline file

use colored::Colorize;
use miette::Result;
use std::path::Path;

use super::DEFAULT_PIPELINE;
use crate::environment::{ensure_config, Materialized};

/// Run the init command
pub async fn run(force: bool, verbose: bool) -> Result<()> {
    let project_name = std::env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|s| s.to_string_lossy().to_string()))
        .unwrap_or_else(|| "my-project".to_string());

    println!("{}", "Initializing ciflow pipeline...".bold());
    println!();

    let path = Path::new(DEFAULT_PIPELINE);
    if force && path.exists() {
        std::fs::remove_file(path)
            .map_err(|e| miette::miette!("Failed to remove {}: {}", DEFAULT_PIPELINE, e))?;
    }

    let pipeline_content = generate_default_template(&project_name);

    match ensure_config(path, &pipeline_content)? {
        Materialized::Created => println!("  {} Created {}", "✓".green(), DEFAULT_PIPELINE),
        Materialized::Existing => {
            return Err(miette::miette!(
                "{} already exists. Use --force to overwrite.",
                DEFAULT_PIPELINE
            ));
        }
    }

    println!();
    println!("{}", "Pipeline initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to match your stack and tests", DEFAULT_PIPELINE.cyan());
    println!("  2. Run {} to check it", "ciflow validate".cyan());
    println!("  3. Run {} to execute the pipeline", "ciflow run".cyan());
    println!();

    if verbose {
        println!("{}", "Generated pipeline:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", pipeline_content.dimmed());
    }

    Ok(())
}

fn generate_default_template(name: &str) -> String {
    format!(
        r#"# ciflow pipeline configuration

version: "1"
name: "{name}"

config_files:
  - path: .env
    from: .env.example

stack:
  compose_file: docker-compose.yml
  build: true
  prune: true

endpoints:
  - name: frontend
    url: http://localhost:3001
    poll_interval_secs: 5
    max_attempts: 30
  - name: backend
    url: http://localhost:3000/graphql
    method: POST
    body: {{ "query": "{{ __typename }}" }}
    poll_interval_secs: 5
    max_attempts: 30

stages:
  - name: http
    description: "HTTP smoke tests"
    command: "python -m pytest tests/test_http_simple.py --junitxml=reports/http.xml"
    timeout_secs: 600
    reports:
      - reports/http.xml
  - name: browser
    description: "Browser tests"
    command: "python -m pytest tests/test_liveqa.py --junitxml=reports/browser.xml"
    continue_on_failure: true
    timeout_secs: 1200
    reports:
      - reports/browser.xml

notify:
  default_recipient: ci@localhost
  recipient_env: GIT_COMMITTER_EMAIL
  sink:
    type: outbox
    dir: .ciflow/outbox
"#
    )
}
