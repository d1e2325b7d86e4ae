// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Pipeline definition structures
//!
//! Defines the schema for .ciflow.yaml files (TOML is accepted too, keyed off
//! the file extension).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::CiflowError;

/// Pipeline definition from .ciflow.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Pipeline version (for future compatibility)
    #[serde(default = "default_version")]
    pub version: String,

    /// Pipeline name
    pub name: String,

    /// Pipeline description
    #[serde(default)]
    pub description: Option<String>,

    /// Global environment variables, visible to every stage
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Configuration files that must exist before anything runs
    #[serde(default)]
    pub config_files: Vec<ConfigFile>,

    /// Container stack to boot; omitted means "already running"
    #[serde(default)]
    pub stack: Option<StackDefinition>,

    /// Services to wait for before running stages
    #[serde(default)]
    pub endpoints: Vec<ServiceEndpoint>,

    /// Stages in execution order
    pub stages: Vec<StageSpec>,

    /// Notification settings
    #[serde(default)]
    pub notify: NotifyConfig,
}

fn default_version() -> String {
    "1".to_string()
}

impl Pipeline {
    /// Load pipeline from a YAML or TOML file
    pub fn from_file(path: &Path) -> Result<Self, CiflowError> {
        if !path.exists() {
            return Err(CiflowError::PipelineNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CiflowError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse pipeline from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, CiflowError> {
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Parse pipeline from TOML string
    pub fn from_toml(source: &str) -> Result<Self, CiflowError> {
        toml::from_str(source).map_err(Into::into)
    }
}

/// A configuration file materialized before launch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Target path, relative to the working directory
    pub path: PathBuf,

    /// Where the default contents come from
    #[serde(flatten)]
    pub template: TemplateSource,
}

/// Source of a config file's default contents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateSource {
    /// Copy another file (e.g. `.env.example`)
    File { from: PathBuf },
    /// Literal contents
    Inline { content: String },
}

impl TemplateSource {
    /// Resolve the template text relative to `base_dir`
    pub fn load(&self, base_dir: &Path) -> Result<String, CiflowError> {
        match self {
            Self::Inline { content } => Ok(content.clone()),
            Self::File { from } => {
                let source = base_dir.join(from);
                std::fs::read_to_string(&source).map_err(|e| CiflowError::ConfigWrite {
                    path: source,
                    error: format!("template source unreadable: {}", e),
                })
            }
        }
    }
}

/// Container stack definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackDefinition {
    /// Container tool binary
    #[serde(default = "default_program")]
    pub program: String,

    /// Compose file path
    #[serde(default = "default_compose_file")]
    pub compose_file: PathBuf,

    /// Compose project name
    #[serde(default)]
    pub project: Option<String>,

    /// Rebuild images on start
    #[serde(default = "default_true")]
    pub build: bool,

    /// Reclaim unused images, containers and networks before start
    #[serde(default = "default_true")]
    pub prune: bool,

    /// Remove named volumes on stop
    #[serde(default)]
    pub down_volumes: bool,

    /// Limit for starting the stack, image builds included
    #[serde(default = "default_up_timeout")]
    pub up_timeout_secs: u64,

    /// Limit for teardown and resource reclamation
    #[serde(default = "default_down_timeout")]
    pub down_timeout_secs: u64,
}

impl Default for StackDefinition {
    fn default() -> Self {
        Self {
            program: default_program(),
            compose_file: default_compose_file(),
            project: None,
            build: true,
            prune: true,
            down_volumes: false,
            up_timeout_secs: default_up_timeout(),
            down_timeout_secs: default_down_timeout(),
        }
    }
}

impl StackDefinition {
    pub fn up_timeout(&self) -> Duration {
        Duration::from_secs(self.up_timeout_secs)
    }

    pub fn down_timeout(&self) -> Duration {
        Duration::from_secs(self.down_timeout_secs)
    }
}

fn default_up_timeout() -> u64 {
    1800
}

fn default_down_timeout() -> u64 {
    300
}

fn default_program() -> String {
    "docker".to_string()
}

fn default_compose_file() -> PathBuf {
    PathBuf::from("docker-compose.yml")
}

fn default_true() -> bool {
    true
}

/// A service the pipeline waits for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Service name (frontend, backend, ...)
    pub name: String,

    /// `http(s)://...` for HTTP probes, `tcp://host:port` for TCP probes
    pub url: String,

    /// Delay between failed probes, in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Maximum number of probes
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Bound on a single probe, in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// HTTP method for HTTP probes
    #[serde(default)]
    pub method: ProbeMethod,

    /// JSON body sent with POST probes
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_attempts() -> u32 {
    30
}

fn default_probe_timeout() -> u64 {
    10
}

impl ServiceEndpoint {
    /// Create an endpoint with default polling policy
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            poll_interval_secs: default_poll_interval(),
            max_attempts: default_max_attempts(),
            probe_timeout_secs: default_probe_timeout(),
            method: ProbeMethod::default(),
            body: None,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Worst-case time spent polling this endpoint, excluding probe time
    pub fn max_wait(&self) -> Duration {
        self.poll_interval() * self.max_attempts.saturating_sub(1)
    }

    /// `host:port` for `tcp://` endpoints
    pub fn tcp_address(&self) -> Option<&str> {
        self.url.strip_prefix("tcp://")
    }
}

/// HTTP probe method
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProbeMethod {
    #[default]
    Get,
    Post,
}

impl std::fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A single pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageSpec {
    /// Stage name (must be unique within pipeline)
    pub name: String,

    /// Stage description
    #[serde(default)]
    pub description: Option<String>,

    /// Command line, run through `shell -c`
    pub command: String,

    /// Shell to use (bash, sh, etc.)
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Continue pipeline even if this stage fails
    #[serde(default)]
    pub continue_on_failure: bool,

    /// Hard limit on the stage's run time, in seconds
    #[serde(default = "default_stage_timeout")]
    pub timeout_secs: u64,

    /// Glob patterns of JUnit reports written by the stage
    #[serde(default)]
    pub reports: Vec<String>,

    /// Environment variables for this stage
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_stage_timeout() -> u64 {
    600
}

impl StageSpec {
    /// Create a mandatory stage with default shell and timeout
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            command: command.into(),
            shell: default_shell(),
            continue_on_failure: false,
            timeout_secs: default_stage_timeout(),
            reports: vec![],
            env: HashMap::new(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Mandatory stages halt the pipeline when they fail
    pub fn is_mandatory(&self) -> bool {
        !self.continue_on_failure
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Address used when the committer cannot be determined
    #[serde(default = "default_recipient")]
    pub default_recipient: String,

    /// Environment variable holding the committer's address
    #[serde(default = "default_recipient_env")]
    pub recipient_env: String,

    /// Sender address written into the message headers
    #[serde(default = "default_sender")]
    pub sender: String,

    /// Prefix for the subject line
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    /// Base URL under which stage artifacts are archived
    #[serde(default)]
    pub artifact_base_url: Option<String>,

    /// Where rendered notifications go
    #[serde(default)]
    pub sink: SinkConfig,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            default_recipient: default_recipient(),
            recipient_env: default_recipient_env(),
            sender: default_sender(),
            subject_prefix: default_subject_prefix(),
            artifact_base_url: None,
            sink: SinkConfig::default(),
        }
    }
}

fn default_recipient() -> String {
    "ci@localhost".to_string()
}

fn default_recipient_env() -> String {
    "GIT_COMMITTER_EMAIL".to_string()
}

fn default_sender() -> String {
    "ciflow@localhost".to_string()
}

fn default_subject_prefix() -> String {
    "[ciflow]".to_string()
}

/// Notification sink
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    /// Write `.eml` files into a directory
    Outbox {
        #[serde(default = "default_outbox")]
        dir: PathBuf,
    },
    /// Pipe the message into a program (e.g. `sendmail -t`)
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        /// Kill the program if it has not finished by then
        #[serde(default = "default_sink_timeout")]
        timeout_secs: u64,
    },
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::Outbox {
            dir: default_outbox(),
        }
    }
}

fn default_outbox() -> PathBuf {
    PathBuf::from(".ciflow/outbox")
}

fn default_sink_timeout() -> u64 {
    60
}
