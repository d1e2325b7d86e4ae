// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Pipeline definitions and execution
//!
//! This module defines the pipeline file schema, validates it, runs its
//! stages and drives a complete run through the [`Orchestrator`].

mod definition;
mod orchestrator;
mod runner;
mod validation;

pub use definition::*;
pub use orchestrator::{Orchestrator, OrchestratorOptions};
pub use runner::{RunOutcome, RunnerOptions, StageRunner};
pub use validation::{PipelineValidator, ValidationResult};
