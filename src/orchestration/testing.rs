//! Recording fakes of the remote API for orchestration tests

use crate::core::error::PublishError;
use crate::core::request::{ArtifactKind, CredentialLocation, CredentialSource, KeyFormat};
use crate::core::traits::{AuthClient, EditsApi, Track, UploadFile};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

pub const FAKE_EDIT_ID: &str = "edit-1";
pub const FAKE_VERSION_CODE: i64 = 42;

/// Remote call that should fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeStep {
    CreateEdit,
    UploadBinary,
    UploadSymbols,
    UpdateTrack(String),
    Commit,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<String>,
    tracks: Vec<Track>,
    failing: Option<FakeStep>,
}

/// In-memory [`EditsApi`] recording every call
#[derive(Clone, Default)]
pub struct FakeEditsApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeEditsApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(self, step: FakeStep) -> Self {
        self.state.lock().unwrap().failing = Some(step);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.state.lock().unwrap().tracks.clone()
    }

    fn record(&self, call: String, step: FakeStep) -> Result<(), PublishError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.clone());
        if state.failing.as_ref() == Some(&step) {
            return Err(PublishError::ApiRejected {
                operation: call,
                status: 400,
                message: "rejected by fake".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EditsApi for FakeEditsApi {
    async fn create_edit(&self, _package_name: &str) -> Result<String, PublishError> {
        self.record("create_edit".to_string(), FakeStep::CreateEdit)?;
        Ok(FAKE_EDIT_ID.to_string())
    }

    async fn upload_binary(
        &self,
        _package_name: &str,
        _edit_id: &str,
        kind: ArtifactKind,
        _upload: UploadFile,
    ) -> Result<i64, PublishError> {
        self.record(format!("upload_binary:{}", kind), FakeStep::UploadBinary)?;
        Ok(FAKE_VERSION_CODE)
    }

    async fn upload_symbols(
        &self,
        _package_name: &str,
        _edit_id: &str,
        version_code: i64,
        _upload: UploadFile,
    ) -> Result<(), PublishError> {
        self.record(
            format!("upload_symbols:{}", version_code),
            FakeStep::UploadSymbols,
        )
    }

    async fn update_track(
        &self,
        _package_name: &str,
        _edit_id: &str,
        track: &Track,
    ) -> Result<(), PublishError> {
        self.record(
            format!("update_track:{}", track.track),
            FakeStep::UpdateTrack(track.track.clone()),
        )?;
        self.state.lock().unwrap().tracks.push(track.clone());
        Ok(())
    }

    async fn commit_edit(&self, _package_name: &str, edit_id: &str) -> Result<String, PublishError> {
        self.record("commit_edit".to_string(), FakeStep::Commit)?;
        Ok(edit_id.to_string())
    }
}

/// [`AuthClient`] handing out a shared [`FakeEditsApi`]
#[derive(Clone, Default)]
pub struct FakeAuthClient {
    pub api: FakeEditsApi,
    reject: bool,
    sources: Arc<Mutex<Vec<String>>>,
}

impl FakeAuthClient {
    pub fn new(api: FakeEditsApi) -> Self {
        Self {
            api,
            ..Default::default()
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    /// `file:<path>`, `p12:<path>:<email>` or `inline` per authorize call
    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthClient for FakeAuthClient {
    async fn authorize(
        &self,
        source: &CredentialSource,
        _application_name: &str,
    ) -> Result<Box<dyn EditsApi>, PublishError> {
        let described = match (&source.location, source.format) {
            (CredentialLocation::File(path), KeyFormat::P12) => format!(
                "p12:{}:{}",
                path.display(),
                source.service_account_email.as_deref().unwrap_or("-")
            ),
            (CredentialLocation::File(path), KeyFormat::Json) => format!("file:{}", path.display()),
            (CredentialLocation::Inline(_), _) => "inline".to_string(),
        };
        self.sources.lock().unwrap().push(described);

        if self.reject {
            return Err(PublishError::AuthenticationFailed {
                operation: "oauth2.token".to_string(),
                message: "invalid_grant".to_string(),
            });
        }
        Ok(Box::new(self.api.clone()))
    }
}
