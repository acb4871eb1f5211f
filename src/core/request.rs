//! Publish request and the typed values derived from it
//!
//! [`PublishRequest`] is the explicit form of the task configuration. Its
//! field names match the keys used by the CI task (`applicationName`,
//! `apkPath`, `rolloutFraction`, ...), so it can be deserialised straight
//! from a YAML task file.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};

pub const TRACK_NONE: &str = "none";
pub const TRACK_INTERNAL: &str = "internal";
pub const TRACK_ALPHA: &str = "alpha";
pub const TRACK_BETA: &str = "beta";
pub const TRACK_PRODUCTION: &str = "production";
pub const TRACK_ROLLOUT: &str = "rollout";
pub const TRACK_CUSTOM: &str = "custom";

/// Every value accepted in the `track` field
pub const RECOGNIZED_TRACKS: &[&str] = &[
    TRACK_NONE,
    TRACK_INTERNAL,
    TRACK_ALPHA,
    TRACK_BETA,
    TRACK_PRODUCTION,
    TRACK_ROLLOUT,
    TRACK_CUSTOM,
];

pub const DEFAULT_TRACK: &str = TRACK_INTERNAL;
pub const DEFAULT_ROLLOUT_FRACTION: &str = "0.1";
pub const DEFAULT_CUSTOM_TRACK_NAMES: &str = "internal, custom1, custom2";

fn default_track() -> String {
    DEFAULT_TRACK.to_string()
}

fn default_rollout_fraction() -> String {
    DEFAULT_ROLLOUT_FRACTION.to_string()
}

fn default_custom_track_names() -> String {
    DEFAULT_CUSTOM_TRACK_NAMES.to_string()
}

/// Accepts `rolloutFraction: 0.2` as well as `rolloutFraction: "0.2"`
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

fn optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|v| SecretString::new(v.into())))
}

/// Service account key container format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeyFormat {
    /// Service account JSON key
    #[default]
    Json,
    /// Legacy PKCS#12 key; needs `serviceAccountEmail`
    P12,
}

/// Where the service account key comes from
#[derive(Debug)]
pub enum CredentialLocation {
    /// Key file, already resolved against the working directory
    File(PathBuf),
    /// Key content pasted into the task configuration
    Inline(SecretString),
}

/// Credential source handed to the auth client
#[derive(Debug)]
pub struct CredentialSource {
    pub location: CredentialLocation,
    pub format: KeyFormat,
    /// Issuer for P12 keys, which do not carry one
    pub service_account_email: Option<String>,
}

/// Unresolved key selection taken from the request
#[derive(Debug)]
pub enum KeySelection<'a> {
    File(&'a str),
    Inline(&'a SecretString),
}

/// Binary container uploaded to the edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// `.apk`
    Apk,
    /// `.aab` (Android App Bundle)
    Bundle,
}

impl ArtifactKind {
    /// Detect the kind from the file name extension
    pub fn from_path(path: &str) -> Option<Self> {
        let extension = Path::new(path.trim())
            .extension()?
            .to_str()?
            .to_ascii_lowercase();
        match extension.as_str() {
            "apk" => Some(Self::Apk),
            "aab" => Some(Self::Bundle),
            _ => None,
        }
    }

    /// MIME type declared for the upload
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Apk => "application/vnd.android.package-archive",
            Self::Bundle => "application/octet-stream",
        }
    }

    /// Edits sub-resource receiving the upload
    pub fn resource(self) -> &'static str {
        match self {
            Self::Apk => "apks",
            Self::Bundle => "bundles",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apk => write!(f, "apk"),
            Self::Bundle => write!(f, "bundle"),
        }
    }
}

/// One publish invocation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// Application name sent as the client's user agent
    #[serde(default)]
    pub application_name: String,

    /// Package name of the app (e.g. `com.example.app`)
    #[serde(default)]
    pub package_name: String,

    /// Read the key from `json_key_path` instead of `json_key_content`
    #[serde(default)]
    pub find_json_key_in_file: bool,

    #[serde(default)]
    pub json_key_path: Option<String>,

    #[serde(default, deserialize_with = "optional_secret")]
    pub json_key_content: Option<SecretString>,

    #[serde(default)]
    pub key_format: KeyFormat,

    /// Legacy key file, read when `key_format` is `p12`
    #[serde(default)]
    pub p12_key_path: Option<String>,

    #[serde(default)]
    pub service_account_email: Option<String>,

    /// Path to the `.apk` or `.aab` to upload
    #[serde(default)]
    pub apk_path: String,

    /// Optional ProGuard/R8 mapping file
    #[serde(default)]
    pub deobfuscation_file_path: Option<String>,

    /// Release notes as `locale::path` entries separated by commas
    #[serde(default)]
    pub recent_changes_listings: Option<String>,

    #[serde(default = "default_track")]
    pub track: String,

    /// Only read when `track` is `rollout`
    #[serde(default = "default_rollout_fraction", deserialize_with = "string_or_number")]
    pub rollout_fraction: String,

    /// Only read when `track` is `custom`
    #[serde(default = "default_custom_track_names")]
    pub track_custom_names: String,
}

impl Default for PublishRequest {
    fn default() -> Self {
        Self {
            application_name: String::new(),
            package_name: String::new(),
            find_json_key_in_file: false,
            json_key_path: None,
            json_key_content: None,
            key_format: KeyFormat::default(),
            p12_key_path: None,
            service_account_email: None,
            apk_path: String::new(),
            deobfuscation_file_path: None,
            recent_changes_listings: None,
            track: default_track(),
            rollout_fraction: default_rollout_fraction(),
            track_custom_names: default_custom_track_names(),
        }
    }
}

impl PublishRequest {
    /// Key selection according to `key_format` and `find_json_key_in_file`
    ///
    /// Returns `None` when the selected field is empty.
    pub fn key_selection(&self) -> Option<KeySelection<'_>> {
        match self.key_format {
            KeyFormat::P12 => non_empty(self.p12_key_path.as_deref()).map(KeySelection::File),
            KeyFormat::Json if self.find_json_key_in_file => {
                non_empty(self.json_key_path.as_deref()).map(KeySelection::File)
            }
            KeyFormat::Json => self
                .json_key_content
                .as_ref()
                .filter(|c| !c.expose_secret().trim().is_empty())
                .map(KeySelection::Inline),
        }
    }

    /// Field holding the selected key, as named in the task file
    pub fn key_field(&self) -> &'static str {
        match self.key_format {
            KeyFormat::P12 => "p12KeyPath",
            KeyFormat::Json if self.find_json_key_in_file => "jsonKeyPath",
            KeyFormat::Json => "jsonKeyContent",
        }
    }

    pub fn service_account_email(&self) -> Option<&str> {
        non_empty(self.service_account_email.as_deref())
    }

    /// Artifact kind of `apk_path`
    pub fn artifact_kind(&self) -> Option<ArtifactKind> {
        ArtifactKind::from_path(&self.apk_path)
    }

    /// Mapping file path, if one was given
    pub fn symbols_path(&self) -> Option<&str> {
        non_empty(self.deobfuscation_file_path.as_deref())
    }

    /// Release notes CSV, if one was given
    pub fn release_notes_listings(&self) -> Option<&str> {
        non_empty(self.recent_changes_listings.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Why a rollout fraction was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum RolloutFractionError {
    Empty,
    NotANumber(String),
    OutOfRange(f64),
}

impl fmt::Display for RolloutFractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "この項目は必須です"),
            Self::NotANumber(value) => {
                write!(f, "ユーザー割合を数値として解釈できません: {}", value)
            }
            Self::OutOfRange(value) => write!(
                f,
                "ユーザー割合は 0 <= fraction < 1 の範囲で指定してください: {}",
                value
            ),
        }
    }
}

/// Staged rollout user fraction, `0 <= value < 1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RolloutFraction(f64);

impl RolloutFraction {
    /// Parse a fraction, reporting either a parse error or a range error
    pub fn parse(raw: &str) -> Result<Self, RolloutFractionError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RolloutFractionError::Empty);
        }

        let value: f64 = trimmed
            .parse()
            .map_err(|_| RolloutFractionError::NotANumber(trimmed.to_string()))?;

        // NaN fails both comparisons and lands here
        if !(0.0..1.0).contains(&value) {
            return Err(RolloutFractionError::OutOfRange(value));
        }

        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Ordered, non-empty list of caller-defined track names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomTrackNameSet(Vec<String>);

impl CustomTrackNameSet {
    /// Split on commas, trim, drop empty segments
    ///
    /// Returns `None` if no name is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let names: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            None
        } else {
            Some(Self(names))
        }
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

/// Which track(s) the uploaded version goes to
#[derive(Debug, Clone, PartialEq)]
pub enum TrackDescriptor {
    /// Upload only, no track assignment
    None,
    /// One built-in track
    Single(String),
    /// Caller-defined track names, assigned in order
    Custom(CustomTrackNameSet),
}
