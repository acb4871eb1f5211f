//! Edit session - one open/upload/assign/commit transaction
//!
//! The session owns the remote edit id and the local [`EditStateMachine`].
//! No step is retried: the first error, local or remote, moves the session
//! to `Failed` and is returned to the caller. Abandoned edits are left to
//! expire on the platform side.
//!
//! The v3 API has no per-version listing resource, so release notes are
//! staged by [`update_listings`](EditSessionClient::update_listings) and sent
//! as `releaseNotes` with every track update.

use crate::core::error::PublishError;
use crate::core::request::ArtifactKind;
use crate::core::state_machine::{EditState, EditStateMachine};
use crate::core::traits::{EditsApi, LocalizedText, Track, UploadFile};
use crate::validation::LocatedFile;

/// Binary accepted by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadedArtifact {
    pub version_code: i64,
    pub kind: ArtifactKind,
}

/// Client for a single edit session
pub struct EditSessionClient<'a> {
    api: &'a dyn EditsApi,
    package_name: String,
    edit_id: Option<String>,
    staged_notes: Vec<LocalizedText>,
    machine: EditStateMachine,
}

impl<'a> EditSessionClient<'a> {
    pub fn new(api: &'a dyn EditsApi, package_name: impl Into<String>) -> Self {
        Self {
            api,
            package_name: package_name.into(),
            edit_id: None,
            staged_notes: Vec::new(),
            machine: EditStateMachine::new(),
        }
    }

    pub fn state(&self) -> EditState {
        self.machine.get_state()
    }

    pub fn edit_id(&self) -> Option<&str> {
        self.edit_id.as_deref()
    }

    pub fn state_machine(&self) -> &EditStateMachine {
        &self.machine
    }

    /// Record the failure and hand the error back
    fn fail(&mut self, error: PublishError) -> PublishError {
        self.machine.fail(error.to_string());
        error
    }

    /// Reject a step the current state does not allow
    fn guard(&mut self, to: EditState) -> Result<(), PublishError> {
        let from = self.machine.get_state();
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(self.fail(PublishError::InvalidTransition { from, to }))
        }
    }

    fn advance(&mut self, to: EditState, note: Option<String>) -> Result<(), PublishError> {
        match self.machine.transition(to, note) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    fn require_edit_id(&mut self) -> Result<String, PublishError> {
        match self.edit_id.clone() {
            Some(edit_id) => Ok(edit_id),
            None => {
                let from = self.machine.get_state();
                Err(self.fail(PublishError::InvalidTransition {
                    from,
                    to: EditState::ArtifactUploaded,
                }))
            }
        }
    }

    async fn open_file(file: &LocatedFile) -> Result<UploadFile, PublishError> {
        file.ensure_exists()?;
        UploadFile::open(&file.resolved)
            .await
            .map_err(|e| PublishError::FileUnreadable {
                path: file.resolved.clone(),
                message: e.to_string(),
            })
    }

    /// Create the remote edit
    pub async fn open(&mut self) -> Result<&str, PublishError> {
        self.guard(EditState::Opened)?;

        match self.api.create_edit(&self.package_name).await {
            Ok(edit_id) => {
                self.advance(EditState::Opened, Some(format!("edit {}", edit_id)))?;
                Ok(self.edit_id.insert(edit_id).as_str())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Upload the binary, returning the version code assigned to it
    pub async fn upload_artifact(
        &mut self,
        file: &LocatedFile,
        kind: ArtifactKind,
    ) -> Result<UploadedArtifact, PublishError> {
        self.guard(EditState::ArtifactUploaded)?;
        let edit_id = self.require_edit_id()?;

        let upload = match Self::open_file(file).await {
            Ok(upload) => upload,
            Err(e) => return Err(self.fail(e)),
        };
        tracing::debug!(path = %file.resolved.display(), bytes = upload.length, "uploading binary");

        match self
            .api
            .upload_binary(&self.package_name, &edit_id, kind, upload)
            .await
        {
            Ok(version_code) => {
                self.advance(
                    EditState::ArtifactUploaded,
                    Some(format!("{} version code {}", kind, version_code)),
                )?;
                Ok(UploadedArtifact { version_code, kind })
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Upload the deobfuscation mapping; returns `false` when there is none
    pub async fn upload_symbols(
        &mut self,
        version_code: i64,
        file: Option<&LocatedFile>,
    ) -> Result<bool, PublishError> {
        let Some(file) = file else {
            return Ok(false);
        };
        self.guard(EditState::SymbolsUploaded)?;
        let edit_id = self.require_edit_id()?;

        let upload = match Self::open_file(file).await {
            Ok(upload) => upload,
            Err(e) => return Err(self.fail(e)),
        };

        match self
            .api
            .upload_symbols(&self.package_name, &edit_id, version_code, upload)
            .await
        {
            Ok(()) => {
                self.advance(EditState::SymbolsUploaded, None)?;
                Ok(true)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Stage "what's new" per locale for the uploaded version code
    ///
    /// The notes go out with the next track updates, in the given order.
    /// Returns `false` when there are none.
    pub fn update_listings(
        &mut self,
        version_code: i64,
        notes: &[LocalizedText],
    ) -> Result<bool, PublishError> {
        if notes.is_empty() {
            return Ok(false);
        }
        self.guard(EditState::ListingsUpdated)?;

        let languages: Vec<&str> = notes.iter().map(|n| n.language.as_str()).collect();
        let note = format!("version code {}: {}", version_code, languages.join(", "));
        self.advance(EditState::ListingsUpdated, Some(note))?;
        self.staged_notes = notes.to_vec();
        Ok(true)
    }

    /// Notes staged for the track updates
    pub fn staged_notes(&self) -> &[LocalizedText] {
        &self.staged_notes
    }

    /// Send one track update, attaching staged notes to releases without any
    ///
    /// The session stays in its current state until
    /// [`mark_tracks_assigned`](Self::mark_tracks_assigned) is called.
    pub async fn assign_track(&mut self, track: &Track) -> Result<(), PublishError> {
        self.guard(EditState::TracksAssigned)?;
        let edit_id = self.require_edit_id()?;

        let mut track = track.clone();
        if !self.staged_notes.is_empty() {
            for release in track.releases.iter_mut().filter(|r| r.release_notes.is_none()) {
                release.release_notes = Some(self.staged_notes.clone());
            }
        }

        match self
            .api
            .update_track(&self.package_name, &edit_id, &track)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Every required track call succeeded
    pub fn mark_tracks_assigned(&mut self, tracks: &[String]) -> Result<(), PublishError> {
        self.advance(EditState::TracksAssigned, Some(tracks.join(", ")))
    }

    /// Commit the edit; the only way a publish succeeds
    pub async fn commit(&mut self) -> Result<String, PublishError> {
        self.guard(EditState::Committed)?;
        let edit_id = self.require_edit_id()?;

        match self.api.commit_edit(&self.package_name, &edit_id).await {
            Ok(committed) => {
                self.advance(EditState::Committed, Some(format!("edit {}", committed)))?;
                Ok(committed)
            }
            Err(e) => Err(self.fail(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::{RELEASE_STATUS_COMPLETED, TrackRelease};
    use crate::orchestration::testing::{FakeEditsApi, FakeStep};
    use crate::validation::ArtifactLocator;
    use tempfile::TempDir;

    fn artifact(temp_dir: &TempDir, name: &str) -> LocatedFile {
        std::fs::write(temp_dir.path().join(name), b"binary").unwrap();
        ArtifactLocator::new(temp_dir.path())
            .locate("APKファイル", name)
            .unwrap()
    }

    fn track(name: &str) -> Track {
        Track {
            track: name.to_string(),
            releases: vec![TrackRelease {
                version_codes: vec!["42".to_string()],
                status: RELEASE_STATUS_COMPLETED.to_string(),
                user_fraction: None,
                release_notes: None,
            }],
        }
    }

    fn notes() -> Vec<LocalizedText> {
        vec![
            LocalizedText {
                language: "en-US".to_string(),
                text: "Bug fixes".to_string(),
            },
            LocalizedText {
                language: "fr-FR".to_string(),
                text: "Corrections".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_happy_path_reaches_committed() {
        let temp_dir = TempDir::new().unwrap();
        let apk = artifact(&temp_dir, "app.apk");
        let mapping = artifact(&temp_dir, "mapping.txt");
        let api = FakeEditsApi::new();
        let mut session = EditSessionClient::new(&api, "com.example.app");

        assert_eq!(session.open().await.unwrap(), "edit-1");
        let uploaded = session.upload_artifact(&apk, ArtifactKind::Apk).await.unwrap();
        assert_eq!(uploaded.version_code, 42);
        assert!(session.upload_symbols(42, Some(&mapping)).await.unwrap());
        assert!(session.update_listings(42, &notes()).unwrap());
        session.assign_track(&track("beta")).await.unwrap();
        session.mark_tracks_assigned(&["beta".to_string()]).unwrap();
        assert_eq!(session.commit().await.unwrap(), "edit-1");

        assert_eq!(session.state(), EditState::Committed);
        assert_eq!(
            api.calls(),
            vec![
                "create_edit",
                "upload_binary:apk",
                "upload_symbols:42",
                "update_track:beta",
                "commit_edit",
            ]
        );
        assert!(
            session
                .state_machine()
                .get_history()
                .contains("version code 42: en-US, fr-FR")
        );
    }

    #[tokio::test]
    async fn test_staged_notes_ride_on_every_track_update() {
        let temp_dir = TempDir::new().unwrap();
        let apk = artifact(&temp_dir, "app.apk");
        let api = FakeEditsApi::new();
        let mut session = EditSessionClient::new(&api, "com.example.app");

        session.open().await.unwrap();
        session.upload_artifact(&apk, ArtifactKind::Apk).await.unwrap();
        session.update_listings(42, &notes()).unwrap();
        session.assign_track(&track("qa")).await.unwrap();
        session.assign_track(&track("dogfood")).await.unwrap();

        let tracks = api.tracks();
        assert_eq!(tracks.len(), 2);
        for sent in &tracks {
            let release_notes = sent.releases[0].release_notes.as_ref().unwrap();
            assert_eq!(release_notes, &notes());
        }
        assert_eq!(session.staged_notes().len(), 2);
    }

    #[tokio::test]
    async fn test_tracks_without_notes_carry_none() {
        let temp_dir = TempDir::new().unwrap();
        let apk = artifact(&temp_dir, "app.apk");
        let api = FakeEditsApi::new();
        let mut session = EditSessionClient::new(&api, "com.example.app");

        session.open().await.unwrap();
        session.upload_artifact(&apk, ArtifactKind::Apk).await.unwrap();
        session.assign_track(&track("beta")).await.unwrap();

        assert!(api.tracks()[0].releases[0].release_notes.is_none());
    }

    #[tokio::test]
    async fn test_optional_steps_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let apk = artifact(&temp_dir, "app.apk");
        let api = FakeEditsApi::new();
        let mut session = EditSessionClient::new(&api, "com.example.app");

        session.open().await.unwrap();
        session.upload_artifact(&apk, ArtifactKind::Apk).await.unwrap();
        assert!(!session.upload_symbols(42, None).await.unwrap());
        assert!(!session.update_listings(42, &[]).unwrap());

        assert_eq!(session.state(), EditState::ArtifactUploaded);
        assert_eq!(api.calls(), vec!["create_edit", "upload_binary:apk"]);
    }

    #[tokio::test]
    async fn test_commit_requires_upload() {
        let api = FakeEditsApi::new();
        let mut session = EditSessionClient::new(&api, "com.example.app");
        session.open().await.unwrap();

        let err = session.commit().await.unwrap_err();

        assert!(matches!(err, PublishError::InvalidTransition { .. }));
        assert_eq!(session.state(), EditState::Failed);
        assert!(session.state_machine().get_last_error().is_some());
        assert_eq!(api.calls(), vec!["create_edit"]);
    }

    #[tokio::test]
    async fn test_listings_before_upload_fail_session() {
        let api = FakeEditsApi::new();
        let mut session = EditSessionClient::new(&api, "com.example.app");
        session.open().await.unwrap();

        let err = session.update_listings(42, &notes()).unwrap_err();

        assert_eq!(err.code(), "INVALID_TRANSITION");
        assert_eq!(session.state(), EditState::Failed);
        assert!(session.staged_notes().is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_before_upload() {
        let temp_dir = TempDir::new().unwrap();
        let apk = artifact(&temp_dir, "app.apk");
        std::fs::remove_file(&apk.resolved).unwrap();
        let api = FakeEditsApi::new();
        let mut session = EditSessionClient::new(&api, "com.example.app");
        session.open().await.unwrap();

        let err = session
            .upload_artifact(&apk, ArtifactKind::Apk)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "FILE_NOT_FOUND");
        assert_eq!(session.state(), EditState::Failed);
        assert_eq!(api.calls(), vec!["create_edit"]);
    }

    #[tokio::test]
    async fn test_remote_error_fails_session() {
        let temp_dir = TempDir::new().unwrap();
        let apk = artifact(&temp_dir, "app.apk");
        let api = FakeEditsApi::new().failing_at(FakeStep::UploadBinary);
        let mut session = EditSessionClient::new(&api, "com.example.app");
        session.open().await.unwrap();

        let err = session
            .upload_artifact(&apk, ArtifactKind::Apk)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "API_REJECTED");
        assert_eq!(session.state(), EditState::Failed);
        assert!(session.state_machine().get_last_error().is_some());
        assert!(session.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_open_failure_fails_session() {
        let api = FakeEditsApi::new().failing_at(FakeStep::CreateEdit);
        let mut session = EditSessionClient::new(&api, "com.example.app");

        assert!(session.open().await.is_err());
        assert_eq!(session.state(), EditState::Failed);
        assert!(session.edit_id().is_none());
    }
}
