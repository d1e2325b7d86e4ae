// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Probe command - wait for the pipeline's services without running stages

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::load_pipeline;
use crate::readiness::{await_all, EndpointProbe};
use crate::utils::{create_spinner, print_error, print_success};

/// Run the probe command
pub async fn run(pipeline_path: PathBuf, verbose: bool) -> Result<()> {
    let pipeline = load_pipeline(&pipeline_path)?;

    if pipeline.endpoints.is_empty() {
        println!("{}", "No endpoints declared, nothing to probe.".dimmed());
        return Ok(());
    }

    if verbose {
        for endpoint in &pipeline.endpoints {
            println!(
                "  {} {} {} (up to {:?})",
                endpoint.method,
                endpoint.url,
                endpoint.name.dimmed(),
                endpoint.max_wait()
            );
        }
    }

    let spinner = create_spinner(&format!(
        "Waiting for {} service(s)...",
        pipeline.endpoints.len()
    ));
    let statuses = await_all(&pipeline.endpoints, &EndpointProbe::new()).await;
    spinner.finish_and_clear();

    let mut not_ready = 0;
    for status in &statuses {
        if status.ready {
            print_success(&format!(
                "{} ready after {} attempt(s)",
                status.name, status.attempts
            ));
        } else {
            not_ready += 1;
            print_error(&format!(
                "{} not ready after {} attempt(s) ({})",
                status.name, status.attempts, status.url
            ));
        }
    }

    if not_ready > 0 {
        Err(miette::miette!("{} endpoint(s) not ready", not_ready))
    } else {
        println!();
        println!("{}", "All services ready!".green().bold());
        Ok(())
    }
}
