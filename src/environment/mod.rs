// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 ciflow contributors

//! Environment materialization
//!
//! Makes sure the configuration files a stack expects (`.env` and friends)
//! exist before anything is launched. Existing files are never touched, so
//! running this repeatedly is safe.

use std::path::{Path, PathBuf};

use crate::errors::CiflowError;
use crate::pipeline::ConfigFile;

/// What [`ensure_config`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialized {
    /// The file was absent and has been written
    Created,
    /// The file already existed and was left as is
    Existing,
}

/// Write `template` to `path` unless a file is already there
pub fn ensure_config(path: &Path, template: &str) -> Result<Materialized, CiflowError> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "config file present, leaving untouched");
        return Ok(Materialized::Existing);
    }

    let write_error = |e: std::io::Error| CiflowError::ConfigWrite {
        path: path.to_path_buf(),
        error: e.to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }

    std::fs::write(path, template).map_err(write_error)?;
    tracing::info!(path = %path.display(), "materialized config file");

    Ok(Materialized::Created)
}

/// Materialize every configured file relative to `base_dir`
///
/// Stops at the first failure; a config write error is fatal for the run.
pub fn materialize_all(
    files: &[ConfigFile],
    base_dir: &Path,
) -> Result<Vec<(PathBuf, Materialized)>, CiflowError> {
    let mut outcomes = Vec::with_capacity(files.len());

    for file in files {
        let target = base_dir.join(&file.path);
        // An existing target never needs its template, so a missing source is fine then
        let outcome = if target.exists() {
            Materialized::Existing
        } else {
            let template = file.template.load(base_dir)?;
            ensure_config(&target, &template)?
        };
        outcomes.push((file.path.clone(), outcome));
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TemplateSource;
    use tempfile::TempDir;

    #[test]
    fn test_creates_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".env");

        let outcome = ensure_config(&path, "PORT=3000\n").unwrap();

        assert_eq!(outcome, Materialized::Created);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "PORT=3000\n");
    }

    #[test]
    fn test_never_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".env");
        std::fs::write(&path, "PORT=4000\n").unwrap();

        let first = ensure_config(&path, "PORT=3000\n").unwrap();
        let second = ensure_config(&path, "PORT=3000\n").unwrap();

        assert_eq!(first, Materialized::Existing);
        assert_eq!(second, Materialized::Existing);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "PORT=4000\n");
    }

    #[test]
    fn test_creates_parent_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("frontend/config/.env.local");

        ensure_config(&path, "X=1").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_target_is_config_write_error() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where a directory is expected
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        let err = ensure_config(&blocker.join(".env"), "X=1").unwrap_err();

        assert!(matches!(err, CiflowError::ConfigWrite { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_materialize_all_from_template_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(".env.example"), "DB=postgres\n").unwrap();

        let files = vec![
            ConfigFile {
                path: PathBuf::from(".env"),
                template: TemplateSource::File {
                    from: PathBuf::from(".env.example"),
                },
            },
            ConfigFile {
                path: PathBuf::from("backend/.env"),
                template: TemplateSource::Inline {
                    content: "REDIS=redis://cache:6379\n".into(),
                },
            },
        ];

        let outcomes = materialize_all(&files, temp_dir.path()).unwrap();
        assert!(outcomes.iter().all(|(_, o)| *o == Materialized::Created));

        let again = materialize_all(&files, temp_dir.path()).unwrap();
        assert!(again.iter().all(|(_, o)| *o == Materialized::Existing));

        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join(".env")).unwrap(),
            "DB=postgres\n"
        );
    }

    #[test]
    fn test_missing_template_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![ConfigFile {
            path: PathBuf::from(".env"),
            template: TemplateSource::File {
                from: PathBuf::from(".env.example"),
            },
        }];

        let err = materialize_all(&files, temp_dir.path()).unwrap_err();
        assert!(matches!(err, CiflowError::ConfigWrite { .. }));
    }
}
