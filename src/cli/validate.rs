// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Validate command - check pipeline configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{load_pipeline, pipeline_base_dir};
use crate::pipeline::PipelineValidator;

/// Run the validate command
pub async fn run(pipeline_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    let pipeline = match load_pipeline(&pipeline_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("  {} Failed to parse pipeline", "✗".red());
            eprintln!();
            return Err(e);
        }
    };

    println!("  {} Pipeline file parsed", "✓".green());

    // Validate pipeline structure
    let validation = PipelineValidator::validate(&pipeline);

    // Check for file existence relative to the pipeline file
    let base_dir = pipeline_base_dir(&pipeline_path)?;
    let missing_files = PipelineValidator::validate_files(&pipeline, &base_dir);

    // Report results
    let mut has_issues = false;

    if !validation.errors.is_empty() {
        has_issues = true;
        println!();
        println!("{}:", "Errors".red().bold());
        for error in &validation.errors {
            println!("  {} {}", "✗".red(), error);
        }
    }

    if !missing_files.is_empty() {
        println!();
        println!("{}:", "Missing files".yellow().bold());
        for missing in &missing_files {
            println!("  {} {}", "⚠".yellow(), missing);
        }
    }

    if !validation.warnings.is_empty() {
        println!();
        println!("{}:", "Warnings".yellow().bold());
        for warning in &validation.warnings {
            println!("  {} {}", "⚠".yellow(), warning);
        }
    }

    if verbose {
        println!();
        println!("{}:", "Pipeline summary".bold());
        println!("  Name: {}", pipeline.name);
        if let Some(stack) = &pipeline.stack {
            println!("  Stack: {} ({})", stack.compose_file.display(), stack.program);
        }
        println!("  Endpoints: {}", pipeline.endpoints.len());
        for endpoint in &pipeline.endpoints {
            println!(
                "    - {} {} {}",
                endpoint.name,
                endpoint.url,
                format!(
                    "[{} x {}s]",
                    endpoint.max_attempts, endpoint.poll_interval_secs
                )
                .dimmed()
            );
        }
        println!("  Stages: {}", pipeline.stages.len());
        for stage in &pipeline.stages {
            let mode = if stage.continue_on_failure {
                " [continue on failure]"
            } else {
                ""
            };
            println!("    - {} ({}s){}", stage.name, stage.timeout_secs, mode.dimmed());
        }
    }

    println!();

    if has_issues {
        Err(miette::miette!("Pipeline validation failed"))
    } else if !missing_files.is_empty() || validation.has_warnings() {
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
        Ok(())
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
        Ok(())
    }
}
