//! Configuration structures for play-publisher
//!
//! A task file holds the publish request fields plus a few runtime knobs
//! that are not part of the request itself.

use crate::core::request::PublishRequest;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connect/read timeout applied to every API request (3 minutes)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 180;

/// Android Publisher API root
pub const DEFAULT_API_BASE_URL: &str = "https://androidpublisher.googleapis.com";

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// What to do with a malformed `locale::path` release notes entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotesPolicy {
    /// Abort the publish before the edit is opened
    #[default]
    Strict,
    /// Log the entry and continue with the next one
    Lenient,
}

/// Runtime options for one publish operation
#[derive(Debug, Clone, PartialEq)]
pub struct PublishOptions {
    pub notes_policy: NotesPolicy,
    pub request_timeout: Duration,
    pub api_base_url: String,
    /// Overrides the `token_uri` of the service account key
    pub token_url: Option<String>,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            notes_policy: NotesPolicy::default(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: None,
        }
    }
}

/// Contents of a `.play-publisher.yaml` task file
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskConfig {
    #[serde(flatten)]
    pub request: PublishRequest,

    #[serde(default)]
    pub notes_policy: NotesPolicy,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub api_base_url: Option<String>,

    #[serde(default)]
    pub token_url: Option<String>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            request: PublishRequest::default(),
            notes_policy: NotesPolicy::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            api_base_url: None,
            token_url: None,
        }
    }
}

impl TaskConfig {
    /// Runtime options described by this file
    pub fn options(&self) -> PublishOptions {
        PublishOptions {
            notes_policy: self.notes_policy,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            api_base_url: self
                .api_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            token_url: self.token_url.clone(),
        }
    }
}
