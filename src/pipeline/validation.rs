// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Pipeline validation
//!
//! Validates pipeline configuration before execution.

use std::collections::HashSet;
use std::path::Path;

use crate::pipeline::{Pipeline, ServiceEndpoint, StageSpec, TemplateSource};

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline configuration
    pub fn validate(pipeline: &Pipeline) -> ValidationResult {
        let mut result = ValidationResult::new();

        // Check for empty stages
        if pipeline.stages.is_empty() {
            result.add_error("Pipeline has no stages defined");
        }

        // Check for duplicate stage names
        let mut seen_names = HashSet::new();
        for stage in &pipeline.stages {
            if !seen_names.insert(&stage.name) {
                result.add_error(&format!("Duplicate stage name: '{}'", stage.name));
            }
        }

        let mut seen_endpoints = HashSet::new();
        for endpoint in &pipeline.endpoints {
            if !seen_endpoints.insert(&endpoint.name) {
                result.add_error(&format!("Duplicate endpoint name: '{}'", endpoint.name));
            }
        }

        for stage in &pipeline.stages {
            Self::validate_stage(stage, &mut result);
        }

        for endpoint in &pipeline.endpoints {
            Self::validate_endpoint(endpoint, &mut result);
        }

        if pipeline.endpoints.is_empty() && pipeline.stack.is_some() {
            result.add_warning(
                "Stack is launched but no endpoints are declared - stages may start before services are up",
            );
        }

        if let Some(stack) = &pipeline.stack {
            if stack.up_timeout_secs == 0 || stack.down_timeout_secs == 0 {
                result.add_error("stack: up_timeout_secs and down_timeout_secs must be greater than zero");
            }
        }

        if pipeline.notify.default_recipient.trim().is_empty() {
            result.add_error("notify.default_recipient must not be empty");
        }

        result
    }

    /// Validate a single stage
    fn validate_stage(stage: &StageSpec, result: &mut ValidationResult) {
        if stage.name.trim().is_empty() {
            result.add_error("Stage with empty name");
        }

        if stage.command.trim().is_empty() {
            result.add_error(&format!("Stage '{}': command is empty", stage.name));
        }

        if stage.timeout_secs == 0 {
            result.add_error(&format!(
                "Stage '{}': timeout_secs must be greater than zero",
                stage.name
            ));
        }

        if stage.reports.is_empty() {
            result.add_warning(&format!(
                "Stage '{}': no reports declared - its test cases will not be counted",
                stage.name
            ));
        }

        for pattern in &stage.reports {
            if let Err(e) = glob::Pattern::new(pattern) {
                result.add_error(&format!(
                    "Stage '{}': invalid report pattern '{}': {}",
                    stage.name, pattern, e
                ));
            }
        }
    }

    /// Validate a single endpoint
    fn validate_endpoint(endpoint: &ServiceEndpoint, result: &mut ValidationResult) {
        if endpoint.max_attempts == 0 {
            result.add_error(&format!(
                "Endpoint '{}': max_attempts must be greater than zero",
                endpoint.name
            ));
        }

        if endpoint.probe_timeout_secs == 0 {
            result.add_error(&format!(
                "Endpoint '{}': probe_timeout_secs must be greater than zero",
                endpoint.name
            ));
        }

        if !Self::is_probeable_url(&endpoint.url) {
            result.add_error(&format!(
                "Endpoint '{}': unsupported URL '{}' (expected http://, https:// or tcp://host:port)",
                endpoint.name, endpoint.url
            ));
        }

        if endpoint.body.is_some() && endpoint.tcp_address().is_some() {
            result.add_warning(&format!(
                "Endpoint '{}': body is ignored for tcp:// probes",
                endpoint.name
            ));
        }
    }

    fn is_probeable_url(url: &str) -> bool {
        if let Some(address) = url.strip_prefix("tcp://") {
            return match address.rsplit_once(':') {
                Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
                None => false,
            };
        }

        ["http://", "https://"]
            .iter()
            .filter_map(|scheme| url.strip_prefix(scheme))
            .any(|rest| !rest.is_empty())
    }

    /// Check that referenced template files exist (runtime validation)
    pub fn validate_files(pipeline: &Pipeline, base_path: &Path) -> Vec<String> {
        let mut missing = Vec::new();

        for file in &pipeline.config_files {
            if base_path.join(&file.path).exists() {
                continue;
            }
            if let TemplateSource::File { from } = &file.template {
                if !base_path.join(from).exists() {
                    missing.push(format!(
                        "Config file '{}': template not found: {}",
                        file.path.display(),
                        from.display()
                    ));
                }
            }
        }

        if let Some(stack) = &pipeline.stack {
            if !base_path.join(&stack.compose_file).exists() {
                missing.push(format!(
                    "Compose file not found: {}",
                    stack.compose_file.display()
                ));
            }
        }

        missing
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
