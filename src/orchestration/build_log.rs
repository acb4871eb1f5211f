//! Ordered build log returned with every publish report
//!
//! Each entry is also emitted as a `tracing` event, so the CLI shows
//! progress live while the report keeps the full trail.

use crate::security::SecretMasker;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.pad(label)
    }
}

/// One line of the build log
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:<5} {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.level,
            self.message
        )
    }
}

/// Append-only build log
#[derive(Debug, Default)]
pub struct BuildLog {
    entries: Vec<LogEntry>,
    masker: SecretMasker,
}

impl BuildLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Never write this secret to the log
    pub fn register_secret(&mut self, secret: &SecretString) {
        self.masker.register(secret);
    }

    pub fn info(&mut self, message: impl AsRef<str>) {
        self.push(LogLevel::Info, message.as_ref());
    }

    pub fn warn(&mut self, message: impl AsRef<str>) {
        self.push(LogLevel::Warn, message.as_ref());
    }

    pub fn error(&mut self, message: impl AsRef<str>) {
        self.push(LogLevel::Error, message.as_ref());
    }

    fn push(&mut self, level: LogLevel, message: &str) {
        let message = self.masker.mask(message);
        match level {
            LogLevel::Info => tracing::info!("{}", message),
            LogLevel::Warn => tracing::warn!("{}", message),
            LogLevel::Error => tracing::error!("{}", message),
        }
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            level,
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Messages only, in order
    pub fn lines(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}
