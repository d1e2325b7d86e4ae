// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Notification sinks

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use super::{outbox_file_name, Document};
use crate::errors::CiflowError;
use crate::pipeline::{NotifyConfig, SinkConfig};

/// Delivers a rendered document to one recipient
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, recipient: &str, document: &Document) -> Result<(), CiflowError>;
}

/// Build the dispatcher configured for this pipeline
pub fn dispatcher_for(config: &NotifyConfig, base_dir: &Path, build_id: &str) -> Box<dyn Dispatcher> {
    match &config.sink {
        SinkConfig::Outbox { dir } => Box::new(OutboxDispatcher::new(
            base_dir.join(dir),
            &config.sender,
            build_id,
        )),
        SinkConfig::Command {
            program,
            args,
            timeout_secs,
        } => Box::new(
            CommandDispatcher::new(program, args.clone(), &config.sender)
                .with_timeout(Duration::from_secs(*timeout_secs)),
        ),
    }
}

/// RFC 822 style message with a plain-text body
fn format_message(sender: &str, recipient: &str, document: &Document, date: DateTime<Utc>) -> String {
    format!(
        "From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
        header_value(sender),
        header_value(recipient),
        header_value(&document.subject),
        date.to_rfc2822(),
        document.body.replace('\n', "\r\n")
    )
}

/// Header values are single-line; control characters become spaces
fn header_value(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Writes each message as an `.eml` file into a directory
pub struct OutboxDispatcher {
    dir: PathBuf,
    sender: String,
    build_id: String,
}

impl OutboxDispatcher {
    pub fn new(dir: impl Into<PathBuf>, sender: &str, build_id: &str) -> Self {
        Self {
            dir: dir.into(),
            sender: sender.to_string(),
            build_id: build_id.to_string(),
        }
    }

    /// Path the message for this build is written to
    pub fn message_path(&self) -> PathBuf {
        self.dir.join(outbox_file_name(&self.build_id))
    }
}

#[async_trait]
impl Dispatcher for OutboxDispatcher {
    async fn dispatch(&self, recipient: &str, document: &Document) -> Result<(), CiflowError> {
        let dispatch_error = |e: std::io::Error| CiflowError::Dispatch {
            recipient: recipient.to_string(),
            reason: format!("cannot write outbox '{}': {}", self.dir.display(), e),
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(dispatch_error)?;

        let path = self.message_path();
        let message = format_message(&self.sender, recipient, document, Utc::now());
        tokio::fs::write(&path, message).await.map_err(dispatch_error)?;

        tracing::info!(recipient, path = %path.display(), "notification written to outbox");
        Ok(())
    }
}

/// Pipes each message into a mail program such as `sendmail -t`
pub struct CommandDispatcher {
    program: String,
    args: Vec<String>,
    sender: String,
    timeout: Duration,
}

impl CommandDispatcher {
    pub fn new(program: &str, args: Vec<String>, sender: &str) -> Self {
        Self {
            program: program.to_string(),
            args,
            sender: sender.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Dispatcher for CommandDispatcher {
    async fn dispatch(&self, recipient: &str, document: &Document) -> Result<(), CiflowError> {
        let dispatch_error = |reason: String| CiflowError::Dispatch {
            recipient: recipient.to_string(),
            reason,
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| dispatch_error(format!("cannot run '{}': {}", self.program, e)))?;

        let message = format_message(&self.sender, recipient, document, Utc::now());
        let delivery = async {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(message.as_bytes())
                    .await
                    .map_err(|e| dispatch_error(format!("cannot write to '{}': {}", self.program, e)))?;
                // Dropping stdin closes the pipe so the program sees EOF
            }

            let output = child
                .wait_with_output()
                .await
                .map_err(|e| dispatch_error(e.to_string()))?;
            Ok::<_, CiflowError>(output)
        };

        let output = timeout(self.timeout, delivery).await.map_err(|_| {
            dispatch_error(format!(
                "'{}' did not finish within {}s",
                self.program,
                self.timeout.as_secs()
            ))
        })??;

        if !output.status.success() {
            return Err(dispatch_error(format!(
                "'{}' exited with code {}: {}",
                self.program,
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tracing::info!(recipient, program = %self.program, "notification handed to mail command");
        Ok(())
    }
}
