//! Orchestration layer for Play publishing
//!
//! This module provides the high-level components that drive one edit
//! session from preflight to commit.

pub mod build_log;
pub mod edit_session;
pub mod publisher;
pub mod track_policy;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use build_log::{BuildLog, LogEntry, LogLevel};
pub use edit_session::{EditSessionClient, UploadedArtifact};
pub use publisher::{PlayPublisher, PreparedPublish, PublishReport};
pub use track_policy::TrackAssignmentPolicy;
