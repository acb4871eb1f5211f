pub mod api;
pub mod core;
pub mod orchestration;
pub mod security;
pub mod validation;

pub use api::AndroidPublisherClient;
pub use crate::core::*;
pub use orchestration::{BuildLog, LogEntry, LogLevel, PlayPublisher, PublishReport};
pub use security::{GoogleServiceAccountAuth, SecretMasker, build_http_client};
pub use validation::{ArtifactLocator, InputValidator, ReleaseNotesParser};
