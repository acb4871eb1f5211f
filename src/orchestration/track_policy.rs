//! Track assignment policy
//!
//! Decides which track(s) the uploaded version goes to and builds the
//! release payload for each. Release notes staged on the session are
//! attached when the payload is sent. Everything that can be rejected is parsed in
//! [`TrackAssignmentPolicy::from_request`], before the edit is opened.

use crate::core::error::PublishError;
use crate::core::request::{
    CustomTrackNameSet, PublishRequest, RECOGNIZED_TRACKS, RolloutFraction, TRACK_CUSTOM,
    TRACK_NONE, TRACK_ROLLOUT, TrackDescriptor,
};
use crate::core::traits::{RELEASE_STATUS_COMPLETED, Track, TrackRelease};
use crate::orchestration::build_log::BuildLog;
use crate::orchestration::edit_session::EditSessionClient;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackAssignmentPolicy {
    descriptor: TrackDescriptor,
    /// Present whenever a target track is named `rollout`
    rollout_fraction: Option<RolloutFraction>,
}

impl TrackAssignmentPolicy {
    pub fn from_request(request: &PublishRequest) -> Result<Self, PublishError> {
        let track = request.track.trim();

        let descriptor = match track {
            TRACK_NONE => TrackDescriptor::None,
            TRACK_CUSTOM => TrackDescriptor::Custom(
                CustomTrackNameSet::parse(&request.track_custom_names).ok_or_else(|| {
                    PublishError::InvalidField {
                        field: "trackCustomNames".to_string(),
                        message: "トラック名が1つも指定されていません".to_string(),
                    }
                })?,
            ),
            name if RECOGNIZED_TRACKS.contains(&name) => TrackDescriptor::Single(name.to_string()),
            other => {
                return Err(PublishError::InvalidField {
                    field: "track".to_string(),
                    message: format!("不明なトラックです: {}", other),
                });
            }
        };

        let mut policy = Self {
            descriptor,
            rollout_fraction: None,
        };

        if policy.track_names().contains(&TRACK_ROLLOUT) {
            let fraction = RolloutFraction::parse(&request.rollout_fraction).map_err(|e| {
                PublishError::InvalidField {
                    field: "rolloutFraction".to_string(),
                    message: e.to_string(),
                }
            })?;
            policy.rollout_fraction = Some(fraction);
        }

        Ok(policy)
    }

    pub fn descriptor(&self) -> &TrackDescriptor {
        &self.descriptor
    }

    /// Target track names in assignment order; empty for `none`
    pub fn track_names(&self) -> Vec<&str> {
        match &self.descriptor {
            TrackDescriptor::None => Vec::new(),
            TrackDescriptor::Single(name) => vec![name.as_str()],
            TrackDescriptor::Custom(set) => set.names().iter().map(String::as_str).collect(),
        }
    }

    /// Release payload for one track
    pub fn release_for(&self, track_name: &str, version_code: i64) -> Track {
        let user_fraction = if track_name == TRACK_ROLLOUT {
            self.rollout_fraction.map(RolloutFraction::value)
        } else {
            None
        };

        Track {
            track: track_name.to_string(),
            releases: vec![TrackRelease {
                version_codes: vec![version_code.to_string()],
                status: RELEASE_STATUS_COMPLETED.to_string(),
                user_fraction,
                release_notes: None,
            }],
        }
    }

    /// Assign the version to every target track, one at a time
    ///
    /// Stops at the first failure. Returns the assigned track names.
    pub async fn apply(
        &self,
        session: &mut EditSessionClient<'_>,
        version_code: i64,
        log: &mut BuildLog,
    ) -> Result<Vec<String>, PublishError> {
        let names = self.track_names();
        if names.is_empty() {
            log.info("Track is \"none\": skipping track assignment");
            return Ok(Vec::new());
        }

        let mut assigned = Vec::with_capacity(names.len());
        for name in names {
            let track = self.release_for(name, version_code);
            match track.releases[0].user_fraction {
                Some(fraction) => log.info(format!(
                    "Assigning version code {} to track \"{}\" (user fraction {})...",
                    version_code, name, fraction
                )),
                None => log.info(format!(
                    "Assigning version code {} to track \"{}\"...",
                    version_code, name
                )),
            }

            session.assign_track(&track).await?;
            log.info(format!("Track \"{}\" updated", name));
            assigned.push(name.to_string());
        }

        session.mark_tracks_assigned(&assigned)?;
        Ok(assigned)
    }
}
