// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Error recovery suggestions
//!
//! Provides actionable suggestions printed by the CLI after a fatal failure.

use super::CiflowError;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
}

impl RecoverySuggestion {
    /// Pick a suggestion for an error, if one applies
    pub fn for_error(error: &CiflowError) -> Option<Self> {
        match error {
            CiflowError::PipelineNotFound { .. } => Some(Self::create_pipeline()),
            CiflowError::Launch { .. } => Some(Self::inspect_stack()),
            CiflowError::ConfigWrite { path, .. } => Some(Self::fix_permissions(&path.display().to_string())),
            CiflowError::Yaml { .. } => Some(Self::fix_yaml_syntax()),
            _ => None,
        }
    }

    /// Suggest creating a pipeline file
    pub fn create_pipeline() -> Self {
        Self {
            action: "Create a pipeline configuration".into(),
            steps: vec![
                "No .ciflow.yaml found in current directory".into(),
                "Generate a starter file and adjust endpoints and stages".into(),
            ],
            commands: vec!["ciflow init".into()],
        }
    }

    /// Suggest inspecting a stack that failed to come up
    pub fn inspect_stack() -> Self {
        Self {
            action: "Inspect the container stack".into(),
            steps: vec![
                "The compose build or start step exited non-zero".into(),
                "Check the build output and container logs".into(),
            ],
            commands: vec![
                "docker compose ps".into(),
                "docker compose logs --tail 100".into(),
            ],
        }
    }

    /// Suggest fixing an unwritable config location
    pub fn fix_permissions(path: &str) -> Self {
        Self {
            action: format!("Make '{}' writable", path),
            steps: vec![
                "ciflow could not create a required configuration file".into(),
                "Check ownership of the checkout directory".into(),
            ],
            commands: vec![format!("ls -la {}", path)],
        }
    }

    /// Suggest fixing invalid YAML
    pub fn fix_yaml_syntax() -> Self {
        Self {
            action: "Fix YAML syntax error in the pipeline file".into(),
            steps: vec![
                "Check for common YAML issues:".into(),
                "  • Incorrect indentation (use spaces, not tabs)".into(),
                "  • Missing colons after keys".into(),
                "  • Unquoted special characters in commands".into(),
            ],
            commands: vec!["ciflow validate".into()],
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_suggestion_for_missing_pipeline() {
        let err = CiflowError::PipelineNotFound {
            path: PathBuf::from(".ciflow.yaml"),
        };
        let suggestion = RecoverySuggestion::for_error(&err).unwrap();
        assert!(suggestion.to_string().contains("ciflow init"));
    }

    #[test]
    fn test_no_suggestion_for_soft_errors() {
        let err = CiflowError::ReadinessTimeout {
            endpoint: "backend".into(),
            attempts_made: 2,
        };
        assert!(RecoverySuggestion::for_error(&err).is_none());
    }
}
