//! Input Validator - checks a publish request before any network I/O
//!
//! Every rule is evaluated and every failure is reported, so a single
//! `check` run shows all configuration problems at once.

use crate::core::request::{
    ArtifactKind, KeyFormat, PublishRequest, RECOGNIZED_TRACKS, RolloutFraction, TRACK_CUSTOM,
    TRACK_ROLLOUT,
};
use crate::core::traits::{ValidationError, ValidationResult};

const REQUIRED: &str = "この項目は必須です";

/// Validator for [`PublishRequest`]
#[derive(Debug, Default)]
pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a request; performs no I/O
    pub fn validate(&self, request: &PublishRequest) -> ValidationResult {
        let mut errors = Vec::new();

        Self::require(&mut errors, "applicationName", &request.application_name);
        Self::require(&mut errors, "packageName", &request.package_name);

        if request.apk_path.trim().is_empty() {
            errors.push(ValidationError::new("apkPath", REQUIRED));
        } else if ArtifactKind::from_path(&request.apk_path).is_none() {
            errors.push(ValidationError::new(
                "apkPath",
                "*.apk または *.aab ファイルのパスを指定してください",
            ));
        }

        if request.key_selection().is_none() {
            errors.push(ValidationError::new(request.key_field(), REQUIRED));
        }
        if request.key_format == KeyFormat::P12 && request.service_account_email().is_none() {
            errors.push(ValidationError::new("serviceAccountEmail", REQUIRED));
        }

        let track = request.track.trim();
        if track.is_empty() {
            errors.push(ValidationError::new("track", REQUIRED));
        } else if !RECOGNIZED_TRACKS.contains(&track) {
            errors.push(ValidationError::new(
                "track",
                format!(
                    "不明なトラックです: {}（指定可能な値: {}）",
                    track,
                    RECOGNIZED_TRACKS.join(", ")
                ),
            ));
        }

        // Rollout and custom fields are only read for their own track
        match track {
            TRACK_ROLLOUT => {
                if let Err(e) = RolloutFraction::parse(&request.rollout_fraction) {
                    errors.push(ValidationError::new("rolloutFraction", e.to_string()));
                }
            }
            TRACK_CUSTOM => {
                if request.track_custom_names.trim().is_empty() {
                    errors.push(ValidationError::new("trackCustomNames", REQUIRED));
                }
            }
            _ => {}
        }

        ValidationResult::from_errors(errors)
    }

    fn require(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, REQUIRED));
        }
    }
}
