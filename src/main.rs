// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! ciflow - CI Pipeline Orchestrator
//!
//! Launch a container stack, wait for it, test it, tear it down, report.

use clap::Parser;
use miette::Result;

use ciflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    ciflow::logging::init_tracing(cli.log_format, cli.verbose)?;
    ciflow::utils::configure_colors();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Init { force } => ciflow::cli::init::run(force, cli.verbose).await,
        Commands::Run {
            pipeline,
            build_id,
            recipient,
            summary,
            skip_launch,
        } => {
            let code = ciflow::cli::run::run(
                pipeline,
                build_id,
                recipient,
                summary,
                skip_launch,
                cli.verbose,
            )
            .await?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Validate { pipeline } => {
            ciflow::cli::validate::run(pipeline, cli.verbose).await
        }
        Commands::Probe { pipeline } => ciflow::cli::probe::run(pipeline, cli.verbose).await,
        Commands::Report { files, format } => {
            ciflow::cli::report::run(files, format, cli.verbose).await
        }
    }
}
