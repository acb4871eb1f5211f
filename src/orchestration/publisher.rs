//! Play Publisher - main orchestrator for one publish operation
//!
//! Manages the complete workflow:
//! - Input validation and track plan (no network)
//! - Release notes and artifact preflight (no network)
//! - Authentication
//! - Edit session: open, upload, symbols, release notes, tracks, commit
//!
//! Every failure is caught here and turned into a failed [`PublishReport`];
//! the build log records each step and ends with the overall outcome.

use crate::core::config::PublishOptions;
use crate::core::error::{ErrorKind, PublishError};
use crate::core::request::{
    ArtifactKind, CredentialLocation, CredentialSource, KeyFormat, KeySelection, PublishRequest,
};
use crate::core::state_machine::EditState;
use crate::core::traits::{AuthClient, LocalizedText};
use crate::orchestration::build_log::{BuildLog, LogEntry};
use crate::orchestration::edit_session::EditSessionClient;
use crate::orchestration::track_policy::TrackAssignmentPolicy;
use crate::validation::{ArtifactLocator, InputValidator, LocatedFile, ReleaseNotesParser};
use std::path::PathBuf;
use std::time::Instant;

/// Publishing report returned after publish operation
#[derive(Debug, Clone)]
pub struct PublishReport {
    pub success: bool,
    pub package_name: String,
    pub state: EditState,
    pub edit_id: Option<String>,
    pub version_code: Option<i64>,
    pub tracks: Vec<String>,
    pub error_kind: Option<ErrorKind>,
    /// Remote operation that failed, for transport and security errors
    pub failed_operation: Option<String>,
    pub errors: Vec<String>,
    pub suggested_actions: Vec<String>,
    pub log: Vec<LogEntry>,
    /// Milliseconds
    pub duration: u64,
    /// Edit session transitions, one per line
    pub history: String,
}

/// Everything resolved before the first network call
#[derive(Debug)]
pub struct PreparedPublish {
    pub policy: TrackAssignmentPolicy,
    pub artifact: LocatedFile,
    pub artifact_kind: ArtifactKind,
    pub symbols: Option<LocatedFile>,
    /// Sent as release notes with every track update
    pub notes: Vec<LocalizedText>,
    pub credentials: CredentialSource,
}

/// Progress carried out of the edit session for the report
#[derive(Debug)]
struct Progress {
    state: EditState,
    edit_id: Option<String>,
    version_code: Option<i64>,
    tracks: Vec<String>,
    history: String,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            state: EditState::Unopened,
            edit_id: None,
            version_code: None,
            tracks: Vec::new(),
            history: String::new(),
        }
    }
}

/// Main Play publishing orchestrator
pub struct PlayPublisher {
    auth: Box<dyn AuthClient>,
    locator: ArtifactLocator,
    options: PublishOptions,
}

impl PlayPublisher {
    /// Create a new PlayPublisher
    ///
    /// # Arguments
    ///
    /// * `auth` - Produces the authenticated API handle
    /// * `working_dir` - Base directory for relative paths in the request
    /// * `options` - Runtime options (notes policy, timeouts, endpoints)
    pub fn new(
        auth: Box<dyn AuthClient>,
        working_dir: impl Into<PathBuf>,
        options: PublishOptions,
    ) -> Self {
        Self {
            auth,
            locator: ArtifactLocator::new(working_dir),
            options,
        }
    }

    /// Validate and resolve everything that does not need the network
    pub async fn prepare(
        &self,
        request: &PublishRequest,
        log: &mut BuildLog,
    ) -> Result<PreparedPublish, PublishError> {
        log.info("Validating task configuration...");
        let validation = InputValidator::new().validate(request);
        if !validation.valid {
            for error in &validation.errors {
                log.error(error.to_string());
            }
        }
        validation.into_result()?;

        let policy = TrackAssignmentPolicy::from_request(request)?;

        let notes = match request.release_notes_listings() {
            Some(listings) => {
                let parsed = ReleaseNotesParser::new(self.options.notes_policy, &self.locator)
                    .load(listings)
                    .await?;
                for skipped in &parsed.skipped {
                    log.warn(format!("Skipping release notes entry: {}", skipped));
                }
                log.info(format!(
                    "Release notes loaded for {} language(s)",
                    parsed.notes.len()
                ));
                parsed.notes
            }
            None => Vec::new(),
        };

        let artifact_kind =
            request
                .artifact_kind()
                .ok_or_else(|| PublishError::InvalidField {
                    field: "apkPath".to_string(),
                    message: "*.apk または *.aab ファイルのパスを指定してください".to_string(),
                })?;
        let label = match artifact_kind {
            ArtifactKind::Apk => "APKファイル",
            ArtifactKind::Bundle => "AABファイル",
        };
        let artifact = self.locator.locate(label, &request.apk_path)?;
        log.info(format!("Found {}: {}", artifact_kind, artifact.resolved.display()));

        let symbols = match request.symbols_path() {
            Some(path) => {
                let located = self.locator.locate("マッピングファイル", path)?;
                log.info(format!("Found mapping file: {}", located.resolved.display()));
                Some(located)
            }
            None => None,
        };

        let key_label = match request.key_format {
            KeyFormat::Json => "JSONキーファイル",
            KeyFormat::P12 => "P12キーファイル",
        };
        let location = match request.key_selection() {
            Some(KeySelection::File(path)) => {
                CredentialLocation::File(self.locator.locate(key_label, path)?.resolved)
            }
            Some(KeySelection::Inline(content)) => CredentialLocation::Inline(content.clone()),
            None => {
                return Err(PublishError::InvalidField {
                    field: request.key_field().to_string(),
                    message: "この項目は必須です".to_string(),
                });
            }
        };

        log.info("Initialized successfully!");
        Ok(PreparedPublish {
            policy,
            artifact,
            artifact_kind,
            symbols,
            notes,
            credentials: CredentialSource {
                location,
                format: request.key_format,
                service_account_email: request.service_account_email().map(str::to_string),
            },
        })
    }

    /// Run the preflight only; nothing is sent to the platform
    pub async fn check(&self, request: &PublishRequest) -> PublishReport {
        let start_time = Instant::now();
        let mut log = Self::new_log(request);

        let result = self.prepare(request, &mut log).await.map(|prepared| {
            let names = prepared.policy.track_names();
            if names.is_empty() {
                log.info("Ready to upload (no track assignment)");
            } else {
                log.info(format!("Ready to publish to: {}", names.join(", ")));
            }
        });

        Self::finish("Check", request, result, Progress::default(), log, start_time)
    }

    /// Publish the request end to end
    pub async fn publish(&self, request: &PublishRequest) -> PublishReport {
        let start_time = Instant::now();
        let mut log = Self::new_log(request);
        let mut progress = Progress::default();

        let result = self.run(request, &mut log, &mut progress).await;
        Self::finish("Publish", request, result, progress, log, start_time)
    }

    fn new_log(request: &PublishRequest) -> BuildLog {
        let mut log = BuildLog::new();
        if let Some(content) = &request.json_key_content {
            log.register_secret(content);
        }
        log
    }

    async fn run(
        &self,
        request: &PublishRequest,
        log: &mut BuildLog,
        progress: &mut Progress,
    ) -> Result<(), PublishError> {
        let prepared = self.prepare(request, log).await?;

        log.info("Creating AndroidPublisher API service...");
        let api = self
            .auth
            .authorize(&prepared.credentials, &request.application_name)
            .await?;
        log.info("AndroidPublisher API service created!");

        let mut session = EditSessionClient::new(api.as_ref(), request.package_name.trim());
        let result = Self::drive(&mut session, &prepared, log, progress).await;

        progress.state = session.state();
        progress.edit_id = session.edit_id().map(str::to_string);
        progress.history = session.state_machine().get_history();
        result
    }

    async fn drive(
        session: &mut EditSessionClient<'_>,
        prepared: &PreparedPublish,
        log: &mut BuildLog,
        progress: &mut Progress,
    ) -> Result<(), PublishError> {
        log.info("Creating edit...");
        let edit_id = session.open().await?;
        log.info(format!("Edit created: {}", edit_id));

        log.info(format!(
            "Uploading {} {}...",
            prepared.artifact_kind, prepared.artifact.original
        ));
        let uploaded = session
            .upload_artifact(&prepared.artifact, prepared.artifact_kind)
            .await?;
        progress.version_code = Some(uploaded.version_code);
        log.info(format!(
            "{} uploaded: version code {}",
            uploaded.kind, uploaded.version_code
        ));

        if let Some(symbols) = &prepared.symbols {
            log.info(format!("Uploading mapping file {}...", symbols.original));
        }
        if session
            .upload_symbols(uploaded.version_code, prepared.symbols.as_ref())
            .await?
        {
            log.info("Mapping file uploaded");
        }

        if session.update_listings(uploaded.version_code, &prepared.notes)? {
            let languages: Vec<&str> =
                prepared.notes.iter().map(|n| n.language.as_str()).collect();
            log.info(format!(
                "Release notes staged for {}",
                languages.join(", ")
            ));
            if prepared.policy.track_names().is_empty() {
                log.warn("Track is \"none\": release notes will not be sent");
            }
        }

        progress.tracks = prepared
            .policy
            .apply(session, uploaded.version_code, log)
            .await?;

        log.info("Committing edit...");
        let committed = session.commit().await?;
        log.info(format!("Edit committed: {}", committed));
        Ok(())
    }

    fn finish(
        operation: &str,
        request: &PublishRequest,
        result: Result<(), PublishError>,
        progress: Progress,
        mut log: BuildLog,
        start_time: Instant,
    ) -> PublishReport {
        let (success, error_kind, failed_operation, errors, suggested_actions) = match result {
            Ok(()) => {
                log.info(format!("{} succeeded", operation));
                (true, None, None, Vec::new(), Vec::new())
            }
            Err(error) => {
                let errors = match &error {
                    PublishError::ValidationFailed { errors } => {
                        errors.iter().map(|e| e.to_string()).collect()
                    }
                    other => vec![other.to_string()],
                };
                log.error(format!("Exception: {}", error));
                log.error(format!("{} failed", operation));
                (
                    false,
                    Some(error.kind()),
                    error.operation().map(str::to_string),
                    errors,
                    error
                        .suggested_actions()
                        .into_iter()
                        .map(str::to_string)
                        .collect(),
                )
            }
        };

        PublishReport {
            success,
            package_name: request.package_name.clone(),
            state: progress.state,
            edit_id: progress.edit_id,
            version_code: progress.version_code,
            tracks: progress.tracks,
            error_kind,
            failed_operation,
            errors,
            suggested_actions,
            log: log.into_entries(),
            duration: start_time.elapsed().as_millis() as u64,
            history: progress.history,
        }
    }
}
