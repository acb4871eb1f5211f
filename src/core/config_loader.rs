//! Configuration file loader for play-publisher
//!
//! Priority (high to low):
//! 1. CLI arguments
//! 2. Environment variables (`PLAY_JSON_KEY_CONTENT`, `PLAY_JSON_KEY_PATH`)
//! 3. Task file (`./.play-publisher.yaml` or `--config`)
//! 4. Default values
//!
//! String fields of the task file may reference CI variables as
//! `${VAR_NAME}`; they are expanded after parsing.

use super::config::{NotesPolicy, TaskConfig};
use super::request::{KeyFormat, PublishRequest};
use crate::core::error::PublishError;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".play-publisher.yaml";

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Inline key content taken from the environment
pub const ENV_JSON_KEY_CONTENT: &str = "PLAY_JSON_KEY_CONTENT";

/// Key file path taken from the environment
pub const ENV_JSON_KEY_PATH: &str = "PLAY_JSON_KEY_PATH";

/// Field values given on the command line
#[derive(Debug, Clone, Default)]
pub struct RequestOverrides {
    pub application_name: Option<String>,
    pub package_name: Option<String>,
    /// Also selects file mode
    pub json_key_path: Option<String>,
    /// Also selects inline mode
    pub json_key_content: Option<String>,
    /// Also selects the P12 format
    pub p12_key_path: Option<String>,
    pub service_account_email: Option<String>,
    pub key_format: Option<KeyFormat>,
    pub apk_path: Option<String>,
    pub deobfuscation_file_path: Option<String>,
    pub recent_changes_listings: Option<String>,
    pub track: Option<String>,
    pub rollout_fraction: Option<String>,
    pub track_custom_names: Option<String>,
    pub notes_policy: Option<NotesPolicy>,
    pub request_timeout_secs: Option<u64>,
}

/// Configuration load options
#[derive(Debug, Clone)]
pub struct ConfigLoadOptions {
    /// Directory searched for the default task file
    pub working_dir: PathBuf,

    /// Explicit task file; must exist when given
    pub config_path: Option<PathBuf>,

    /// Environment variables
    pub env: HashMap<String, String>,

    /// CLI arguments (highest priority)
    pub overrides: RequestOverrides,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with priority
    pub async fn load(options: ConfigLoadOptions) -> Result<TaskConfig, PublishError> {
        let mut config = match &options.config_path {
            Some(path) => {
                let path = if path.is_absolute() {
                    path.clone()
                } else {
                    options.working_dir.join(path)
                };
                Self::load_config_file(&path).await?.ok_or_else(|| {
                    PublishError::ConfigError {
                        message: format!("設定ファイルが見つかりません: {}", path.display()),
                    }
                })?
            }
            None => Self::load_config_file(&options.working_dir.join(CONFIG_FILENAME))
                .await?
                .unwrap_or_default(),
        };

        Self::expand_env_vars(&mut config.request, &options.env)?;
        Self::apply_env(&mut config.request, &options.env);
        Self::apply_overrides(&mut config, options.overrides);

        Ok(config)
    }

    /// Load configuration from a YAML file
    async fn load_config_file(file_path: &Path) -> Result<Option<TaskConfig>, PublishError> {
        if !file_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(file_path)
            .await
            .map_err(|e| PublishError::ConfigError {
                message: format!("{} を読み込めません: {}", file_path.display(), e),
            })?;

        let config: TaskConfig =
            serde_yaml::from_str(&content).map_err(|e| PublishError::ConfigError {
                message: format!("{} のYAML解析に失敗しました: {}", file_path.display(), e),
            })?;

        tracing::debug!(path = %file_path.display(), "task file loaded");
        Ok(Some(config))
    }

    /// Fill the JSON key selection from the environment when the file left it empty
    fn apply_env(request: &mut PublishRequest, env: &HashMap<String, String>) {
        if request.key_format != KeyFormat::Json || request.key_selection().is_some() {
            return;
        }

        if let Some(content) = env.get(ENV_JSON_KEY_CONTENT).filter(|c| !c.trim().is_empty()) {
            request.find_json_key_in_file = false;
            request.json_key_content = Some(SecretString::new(content.clone().into()));
        } else if let Some(path) = env.get(ENV_JSON_KEY_PATH).filter(|p| !p.trim().is_empty()) {
            request.find_json_key_in_file = true;
            request.json_key_path = Some(path.clone());
        }
    }

    /// Apply CLI arguments on top of everything else
    fn apply_overrides(config: &mut TaskConfig, overrides: RequestOverrides) {
        let request = &mut config.request;

        if let Some(value) = overrides.application_name {
            request.application_name = value;
        }
        if let Some(value) = overrides.package_name {
            request.package_name = value;
        }
        if let Some(value) = overrides.json_key_path {
            request.key_format = KeyFormat::Json;
            request.find_json_key_in_file = true;
            request.json_key_path = Some(value);
        }
        if let Some(value) = overrides.json_key_content {
            request.key_format = KeyFormat::Json;
            request.find_json_key_in_file = false;
            request.json_key_content = Some(SecretString::new(value.into()));
        }
        if let Some(value) = overrides.p12_key_path {
            request.key_format = KeyFormat::P12;
            request.p12_key_path = Some(value);
        }
        if let Some(value) = overrides.service_account_email {
            request.service_account_email = Some(value);
        }
        if let Some(value) = overrides.key_format {
            request.key_format = value;
        }
        if let Some(value) = overrides.apk_path {
            request.apk_path = value;
        }
        if let Some(value) = overrides.deobfuscation_file_path {
            request.deobfuscation_file_path = Some(value);
        }
        if let Some(value) = overrides.recent_changes_listings {
            request.recent_changes_listings = Some(value);
        }
        if let Some(value) = overrides.track {
            request.track = value;
        }
        if let Some(value) = overrides.rollout_fraction {
            request.rollout_fraction = value;
        }
        if let Some(value) = overrides.track_custom_names {
            request.track_custom_names = value;
        }
        if let Some(value) = overrides.notes_policy {
            config.notes_policy = value;
        }
        if let Some(value) = overrides.request_timeout_secs {
            config.request_timeout_secs = value;
        }
    }

    /// Expand `${VAR}` references in every string field of the request
    fn expand_env_vars(
        request: &mut PublishRequest,
        env: &HashMap<String, String>,
    ) -> Result<(), PublishError> {
        let pattern = Regex::new(ENV_VAR_PATTERN).map_err(|e| PublishError::ConfigError {
            message: e.to_string(),
        })?;

        for field in [
            &mut request.application_name,
            &mut request.package_name,
            &mut request.apk_path,
            &mut request.track,
            &mut request.rollout_fraction,
            &mut request.track_custom_names,
        ] {
            *field = Self::expand_string(&pattern, field, env)?;
        }

        for field in [
            &mut request.json_key_path,
            &mut request.p12_key_path,
            &mut request.service_account_email,
            &mut request.deobfuscation_file_path,
            &mut request.recent_changes_listings,
        ] {
            if let Some(value) = field.as_mut() {
                *value = Self::expand_string(&pattern, value, env)?;
            }
        }

        if let Some(content) = &request.json_key_content {
            let expanded = Self::expand_string(&pattern, content.expose_secret(), env)?;
            request.json_key_content = Some(SecretString::new(expanded.into()));
        }

        Ok(())
    }

    /// Expand environment variables in a single string
    ///
    /// A reference to an unset variable is a configuration error.
    fn expand_string(
        pattern: &Regex,
        input: &str,
        env: &HashMap<String, String>,
    ) -> Result<String, PublishError> {
        let mut missing = Vec::new();
        let expanded = pattern.replace_all(input, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match env.get(name) {
                Some(value) => value.clone(),
                None => {
                    missing.push(name.to_string());
                    String::new()
                }
            }
        });

        if !missing.is_empty() {
            return Err(PublishError::ConfigError {
                message: format!("環境変数が設定されていません: {}", missing.join(", ")),
            });
        }

        Ok(expanded.into_owned())
    }
}
