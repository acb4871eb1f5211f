//! Core traits and types for Play publishing
//!
//! This module defines the remote API abstraction ([`EditsApi`]), the
//! authentication seam ([`AuthClient`]) and the data exchanged through them.

use crate::core::error::PublishError;
use crate::core::request::{ArtifactKind, CredentialSource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Validation
// ============================================================================

/// Validation error with field information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)
    }
}

/// Result of request validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Errors reported for one field
    pub fn errors_for(&self, field: &str) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.field == field).collect()
    }

    /// Convert into a `Result`, failing with every collected error
    pub fn into_result(self) -> Result<(), PublishError> {
        if self.valid {
            Ok(())
        } else {
            Err(PublishError::ValidationFailed {
                errors: self.errors,
            })
        }
    }
}

// ============================================================================
// Track payloads
// ============================================================================

/// Release status sent with every track release
pub const RELEASE_STATUS_COMPLETED: &str = "completed";

/// Localized release notes text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub language: String,
    pub text: String,
}

/// One release on a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRelease {
    /// Version codes as decimal strings (int64 on the wire)
    pub version_codes: Vec<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_fraction: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<Vec<LocalizedText>>,
}

/// Track update payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub track: String,
    pub releases: Vec<TrackRelease>,
}

// ============================================================================
// Remote API
// ============================================================================

/// Opened local file streamed as an upload body
#[derive(Debug)]
pub struct UploadFile {
    pub file: tokio::fs::File,
    /// Size in bytes, sent as Content-Length
    pub length: u64,
}

impl UploadFile {
    /// Open a file and read its size
    pub async fn open(path: &std::path::Path) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        let length = file.metadata().await?.len();
        Ok(Self { file, length })
    }
}

/// Edits API of the distribution platform
///
/// Every call is awaited before the next one starts; later calls depend on
/// the edit id and version code returned by earlier ones.
#[async_trait]
pub trait EditsApi: Send + Sync {
    /// Open a new edit, returning its id
    async fn create_edit(&self, package_name: &str) -> Result<String, PublishError>;

    /// Upload the binary, returning the version code the platform assigned
    async fn upload_binary(
        &self,
        package_name: &str,
        edit_id: &str,
        kind: ArtifactKind,
        upload: UploadFile,
    ) -> Result<i64, PublishError>;

    /// Upload a deobfuscation mapping for a version code
    async fn upload_symbols(
        &self,
        package_name: &str,
        edit_id: &str,
        version_code: i64,
        upload: UploadFile,
    ) -> Result<(), PublishError>;

    /// Replace the releases of a track; release notes travel on each release
    async fn update_track(
        &self,
        package_name: &str,
        edit_id: &str,
        track: &Track,
    ) -> Result<(), PublishError>;

    /// Commit the edit, returning the committed edit id
    async fn commit_edit(&self, package_name: &str, edit_id: &str) -> Result<String, PublishError>;
}

/// Produces an authenticated [`EditsApi`] from a credential source
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn authorize(
        &self,
        source: &CredentialSource,
        application_name: &str,
    ) -> Result<Box<dyn EditsApi>, PublishError>;
}
