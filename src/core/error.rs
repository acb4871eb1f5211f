//! Error handling for Play publishing
//!
//! This module provides a single error type for the whole publish
//! transaction. Every variant carries an [`ErrorKind`] tag so the
//! orchestrator can report configuration, precondition, transport and
//! security failures uniformly.

use crate::core::state_machine::EditState;
use crate::core::traits::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Missing or malformed configuration, detected before any network call
    Configuration,
    /// Files missing or unusable at execution time, or an illegal session step
    Precondition,
    /// Network failure, timeout or remote API rejection
    Transport,
    /// Authentication or authorisation failure
    Security,
    /// Bad `locale::path` release notes entry
    MalformedEntry,
}

/// Main error type for publish operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Configuration errors
    #[error("入力の検証に失敗しました（{}件のエラー）", .errors.len())]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("[{field}] {message}")]
    InvalidField { field: String, message: String },

    #[error("設定の読み込みに失敗しました: {message}")]
    ConfigError { message: String },

    // Precondition errors
    #[error("{label}が見つかりません: {path}（解決後のパス: {}）", .resolved.display())]
    FileNotFound {
        label: String,
        path: String,
        resolved: PathBuf,
    },

    #[error("ファイルの読み込みに失敗しました: {} ({message})", .path.display())]
    FileUnreadable { path: PathBuf, message: String },

    #[error("編集セッションの状態遷移が不正です: {from:?} → {to:?}")]
    InvalidTransition { from: EditState, to: EditState },

    // Release notes errors
    #[error("不正なリリースノート指定です: \"{entry}\"（{reason}）")]
    MalformedEntry { entry: String, reason: String },

    // Security errors
    #[error("[{operation}] 認証に失敗しました: {message}")]
    AuthenticationFailed { operation: String, message: String },

    #[error("認証キーを利用できません: {message}")]
    InvalidCredentials { message: String },

    // Transport errors
    #[error("[{operation}] ネットワークエラーが発生しました: {message}")]
    NetworkError { operation: String, message: String },

    #[error("[{operation}] タイムアウトしました")]
    TimeoutError { operation: String },

    #[error("[{operation}] APIがリクエストを拒否しました（HTTP {status}）: {message}")]
    ApiRejected {
        operation: String,
        status: u16,
        message: String,
    },
}

impl PublishError {
    /// Get the category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationFailed { .. }
            | Self::InvalidField { .. }
            | Self::ConfigError { .. } => ErrorKind::Configuration,
            Self::FileNotFound { .. }
            | Self::FileUnreadable { .. }
            | Self::InvalidTransition { .. } => ErrorKind::Precondition,
            Self::MalformedEntry { .. } => ErrorKind::MalformedEntry,
            Self::AuthenticationFailed { .. } | Self::InvalidCredentials { .. } => {
                ErrorKind::Security
            }
            Self::NetworkError { .. } | Self::TimeoutError { .. } | Self::ApiRejected { .. } => {
                ErrorKind::Transport
            }
        }
    }

    /// Remote operation that failed, if the error came from the API
    pub fn operation(&self) -> Option<&str> {
        match self {
            Self::AuthenticationFailed { operation, .. }
            | Self::NetworkError { operation, .. }
            | Self::TimeoutError { operation }
            | Self::ApiRejected { operation, .. } => Some(operation),
            _ => None,
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::ValidationFailed { .. } | Self::InvalidField { .. } => {
                vec!["検証エラーを確認してください", "タスク設定を修正してください"]
            }
            Self::ConfigError { .. } => vec![
                ".play-publisher.yamlの書式を確認してください",
                "参照している環境変数が設定されているか確認してください",
            ],
            Self::FileNotFound { .. } => vec![
                "ビルド成果物が生成されているか確認してください",
                "相対パスは作業ディレクトリからの相対で指定してください",
            ],
            Self::FileUnreadable { .. } => vec!["ファイルの権限を確認してください"],
            Self::InvalidTransition { .. } => {
                vec!["公開処理を最初からやり直してください"]
            }
            Self::MalformedEntry { .. } => vec![
                "\"en-US::notes/en.txt\" の形式で指定してください",
                "複数指定する場合はカンマで区切ってください",
            ],
            Self::AuthenticationFailed { .. } => vec![
                "サービスアカウントに Google Play Console の権限があるか確認してください",
                "JSONキーが失効していないか確認してください",
            ],
            Self::InvalidCredentials { .. } => vec![
                "Google Cloud Console からキーを再発行してください",
                "P12キーの場合はserviceAccountEmailを確認してください",
            ],
            Self::NetworkError { .. } => vec![
                "インターネット接続を確認してください",
                "しばらく待ってから再実行してください",
            ],
            Self::TimeoutError { .. } => vec![
                "ネットワーク環境を確認してください",
                "requestTimeoutSecsで時間を延長できます",
            ],
            Self::ApiRejected { .. } => vec![
                "エラーメッセージを確認してください",
                "バージョンコードが既存のものより大きいか確認してください",
            ],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationFailed { .. } => "VALIDATION_FAILED",
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::ConfigError { .. } => "CONFIG_ERROR",
            Self::FileNotFound { .. } => "FILE_NOT_FOUND",
            Self::FileUnreadable { .. } => "FILE_UNREADABLE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::MalformedEntry { .. } => "MALFORMED_ENTRY",
            Self::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            Self::InvalidCredentials { .. } => "INVALID_CREDENTIALS",
            Self::NetworkError { .. } => "NETWORK_ERROR",
            Self::TimeoutError { .. } => "TIMEOUT_ERROR",
            Self::ApiRejected { .. } => "API_REJECTED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_failed_error() {
        let error = PublishError::ValidationFailed {
            errors: vec![
                ValidationError::new("packageName", "この項目は必須です"),
                ValidationError::new("apkPath", "この項目は必須です"),
            ],
        };

        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert_eq!(error.code(), "VALIDATION_FAILED");
        assert!(error.to_string().contains("2件"));
        assert_eq!(error.operation(), None);
    }

    #[test]
    fn test_file_not_found_names_both_paths() {
        let error = PublishError::FileNotFound {
            label: "APKファイル".to_string(),
            path: "build/app.apk".to_string(),
            resolved: PathBuf::from("/work/build/app.apk"),
        };

        let msg = error.to_string();
        assert!(msg.contains("build/app.apk"));
        assert!(msg.contains("/work/build/app.apk"));
        assert_eq!(error.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn test_malformed_entry_error() {
        let error = PublishError::MalformedEntry {
            entry: "en-US".to_string(),
            reason: "expected locale::path".to_string(),
        };

        assert_eq!(error.kind(), ErrorKind::MalformedEntry);
        assert_eq!(error.code(), "MALFORMED_ENTRY");
        assert!(error.to_string().contains("en-US"));
    }

    #[test]
    fn test_invalid_transition_error() {
        let error = PublishError::InvalidTransition {
            from: EditState::Unopened,
            to: EditState::Committed,
        };

        assert_eq!(error.kind(), ErrorKind::Precondition);
        assert_eq!(error.code(), "INVALID_TRANSITION");
        assert!(error.to_string().contains("Unopened"));
    }

    #[test]
    fn test_api_rejected_error() {
        let error = PublishError::ApiRejected {
            operation: "tracks.update".to_string(),
            status: 400,
            message: "Version code 12 has already been used.".to_string(),
        };

        assert_eq!(error.kind(), ErrorKind::Transport);
        assert_eq!(error.operation(), Some("tracks.update"));
        let msg = error.to_string();
        assert!(msg.contains("HTTP 400"));
        assert!(msg.contains("already been used"));
    }

    #[test]
    fn test_authentication_failed_error() {
        let error = PublishError::AuthenticationFailed {
            operation: "edits.insert".to_string(),
            message: "The caller does not have permission".to_string(),
        };

        assert_eq!(error.kind(), ErrorKind::Security);
        assert_eq!(error.code(), "AUTHENTICATION_FAILED");
        assert_eq!(error.operation(), Some("edits.insert"));
        assert!(error.suggested_actions().len() >= 2);
    }

    #[test]
    fn test_timeout_error() {
        let error = PublishError::TimeoutError {
            operation: "apks.upload".to_string(),
        };

        assert_eq!(error.kind(), ErrorKind::Transport);
        assert_eq!(error.code(), "TIMEOUT_ERROR");
        assert!(
            error
                .suggested_actions()
                .iter()
                .any(|a| a.contains("requestTimeoutSecs"))
        );
    }

    #[test]
    fn test_error_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::MalformedEntry).unwrap();
        assert_eq!(json, r#""MALFORMED_ENTRY""#);
    }
}
