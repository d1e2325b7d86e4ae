// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! # ciflow - CI Pipeline Orchestrator
//!
//! `ciflow` drives a containerized integration-test run from start to finish.
//!
//! ## Features
//!
//! - **Environment materialization** - Create `.env` and friends from templates, never overwrite
//! - **Stack lifecycle** - Reclaim space, `compose up`, and always `compose down`
//! - **Readiness polling** - Wait for every service concurrently, with bounded retries
//! - **Stage runner** - Sequential test stages with timeouts and process-group cleanup
//! - **JUnit aggregation** - One report and one verdict across all stages
//! - **Notification** - A single plain-text report per build, whatever happened
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a starter pipeline
//! ciflow init
//!
//! # Check it
//! ciflow validate
//!
//! # Run it
//! ciflow run --build-id 42
//! ```

pub mod cli;
pub mod context;
pub mod environment;
pub mod errors;
pub mod executors;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod readiness;
pub mod report;
pub mod stack;
pub mod utils;

// Re-export commonly used types
pub use context::RunContext;
pub use errors::{CiflowError, CiflowResult};
pub use pipeline::{Orchestrator, Pipeline, StageSpec};
pub use report::{AggregateReport, OverallOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
