// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for ciflow.

pub mod init;
pub mod probe;
pub mod report;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::logging::LogFormat;

/// Default pipeline file name
pub const DEFAULT_PIPELINE: &str = ".ciflow.yaml";

/// CI pipeline orchestrator
///
/// Boots a container stack, waits for its services, runs test stages and
/// reports the verdict.
#[derive(Parser, Debug)]
#[clap(
    name = "ciflow",
    version,
    about = "CI pipeline orchestrator for containerized integration tests",
    long_about = None,
    after_help = "Examples:\n\
        ciflow init                     Write a starter .ciflow.yaml\n\
        ciflow validate                 Check the pipeline file\n\
        ciflow run                      Launch, test, tear down, notify\n\
        ciflow report reports/*.xml     Summarize JUnit reports\n\n\
        See 'ciflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Log line format
    #[clap(long, global = true, value_enum, default_value = "pretty", env = "CIFLOW_LOG_FORMAT")]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter pipeline file
    Init {
        /// Overwrite an existing pipeline file
        #[clap(short, long)]
        force: bool,
    },

    /// Run the pipeline: launch, wait, test, tear down, notify
    Run {
        /// Pipeline file
        #[clap(short, long, default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,

        /// Build identifier (falls back to BUILD_NUMBER, GITHUB_RUN_ID, then a UUID)
        #[clap(long, env = "CIFLOW_BUILD_ID")]
        build_id: Option<String>,

        /// Notification recipient (falls back to the committer, then the default)
        #[clap(long, env = "CIFLOW_RECIPIENT")]
        recipient: Option<String>,

        /// Write the run summary as JSON
        #[clap(long, value_name = "PATH")]
        summary: Option<PathBuf>,

        /// Assume the stack is already running
        #[clap(long)]
        skip_launch: bool,
    },

    /// Validate pipeline configuration
    Validate {
        /// Pipeline file to validate
        #[clap(default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,
    },

    /// Poll the pipeline's endpoints until they are ready
    Probe {
        /// Pipeline file
        #[clap(short, long, default_value = DEFAULT_PIPELINE)]
        pipeline: PathBuf,
    },

    /// Summarize JUnit XML reports
    Report {
        /// Report files
        #[clap(required = true)]
        files: Vec<PathBuf>,

        /// Output format
        #[clap(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format for the report command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Load a pipeline, turning loader errors into diagnostics
pub(crate) fn load_pipeline(path: &Path) -> miette::Result<crate::pipeline::Pipeline> {
    crate::pipeline::Pipeline::from_file(path).map_err(|e| {
        if let Some(suggestion) = crate::errors::RecoverySuggestion::for_error(&e) {
            eprintln!("{}", suggestion);
        }
        miette::Report::new(e)
    })
}

/// Directory that relative paths inside a pipeline file resolve against
pub(crate) fn pipeline_base_dir(pipeline_path: &Path) -> miette::Result<PathBuf> {
    let current = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;

    Ok(match pipeline_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => current.join(parent),
        None => current,
    })
}
