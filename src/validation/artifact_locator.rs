//! Artifact Locator - resolves task paths against the working directory
//!
//! Relative paths in the task configuration are relative to the build's
//! working directory; absolute paths are used unchanged.

use crate::core::error::PublishError;
use std::path::{Path, PathBuf};

/// A file found by [`ArtifactLocator::locate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedFile {
    /// Human readable name used in errors (e.g. "APKファイル")
    pub label: String,
    /// Path as written in the configuration
    pub original: String,
    pub resolved: PathBuf,
}

impl LocatedFile {
    /// Check again that the file is still there
    ///
    /// Build steps running between preflight and upload may remove it.
    pub fn ensure_exists(&self) -> Result<(), PublishError> {
        if self.resolved.is_file() {
            Ok(())
        } else {
            Err(PublishError::FileNotFound {
                label: self.label.clone(),
                path: self.original.clone(),
                resolved: self.resolved.clone(),
            })
        }
    }
}

/// Resolves and checks files referenced by a publish request
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    working_dir: PathBuf,
}

impl ArtifactLocator {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
        }
    }

    /// Join a relative path with the working directory
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path.trim());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    /// Resolve `path` and confirm that a file exists there
    pub fn locate(&self, label: &str, path: &str) -> Result<LocatedFile, PublishError> {
        let located = LocatedFile {
            label: label.to_string(),
            original: path.trim().to_string(),
            resolved: self.resolve(path),
        };
        located.ensure_exists()?;
        Ok(located)
    }
}
