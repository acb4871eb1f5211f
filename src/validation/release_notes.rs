//! Release notes parser for `recentChangesListings`
//!
//! The field is a comma separated list of `locale::path` entries, e.g.
//! `en-US::notes/en.txt, fr-FR::notes/fr.txt`. Each path is resolved
//! against the working directory and read as UTF-8 text.

use crate::core::config::NotesPolicy;
use crate::core::error::PublishError;
use crate::core::traits::LocalizedText;
use crate::validation::artifact_locator::ArtifactLocator;
use regex::Regex;
use std::path::PathBuf;
use tokio::fs;

const ENTRY_SEPARATOR: &str = r"\s*,\s*";
const PAIR_SEPARATOR: &str = r"\s*::\s*";

/// One well-formed `locale::path` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesEntry {
    pub language: String,
    pub path: String,
}

/// Loaded release notes plus the entries dropped under the lenient policy
#[derive(Debug, Default)]
pub struct ParsedReleaseNotes {
    /// In the order they were listed
    pub notes: Vec<LocalizedText>,
    /// Always empty under [`NotesPolicy::Strict`]
    pub skipped: Vec<PublishError>,
}

/// Parses and loads release notes according to a [`NotesPolicy`]
pub struct ReleaseNotesParser<'a> {
    policy: NotesPolicy,
    locator: &'a ArtifactLocator,
}

impl<'a> ReleaseNotesParser<'a> {
    pub fn new(policy: NotesPolicy, locator: &'a ArtifactLocator) -> Self {
        Self { policy, locator }
    }

    /// Split the CSV into entries without touching the filesystem
    ///
    /// Empty segments after the last comma are ignored.
    pub fn split_entries(listings: &str) -> Result<Vec<Result<NotesEntry, PublishError>>, PublishError> {
        let entry_separator = Self::regex(ENTRY_SEPARATOR)?;
        let pair_separator = Self::regex(PAIR_SEPARATOR)?;

        let mut raw_entries: Vec<&str> = entry_separator.split(listings.trim()).collect();
        while raw_entries.last().is_some_and(|e| e.is_empty()) {
            raw_entries.pop();
        }

        Ok(raw_entries
            .into_iter()
            .map(|raw| Self::parse_entry(&pair_separator, raw))
            .collect())
    }

    fn parse_entry(pair_separator: &Regex, raw: &str) -> Result<NotesEntry, PublishError> {
        let pieces: Vec<&str> = pair_separator.split(raw).collect();
        match pieces.as_slice() {
            [language, path] if !language.is_empty() && !path.is_empty() => Ok(NotesEntry {
                language: language.to_string(),
                path: path.to_string(),
            }),
            [_, _] => Err(PublishError::MalformedEntry {
                entry: raw.to_string(),
                reason: "言語コードとパスの両方が必要です".to_string(),
            }),
            _ => Err(PublishError::MalformedEntry {
                entry: raw.to_string(),
                reason: "\"locale::path\" の形式ではありません".to_string(),
            }),
        }
    }

    /// Parse the CSV and read every notes file
    ///
    /// Under the strict policy the first malformed entry is returned as the
    /// error; under the lenient policy it is collected in `skipped`.
    pub async fn load(&self, listings: &str) -> Result<ParsedReleaseNotes, PublishError> {
        let mut parsed = ParsedReleaseNotes::default();

        for entry in Self::split_entries(listings)? {
            let outcome = match entry {
                Ok(entry) => self.read_entry(entry).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(notes) => parsed.notes.push(notes),
                Err(e @ PublishError::MalformedEntry { .. }) if self.policy == NotesPolicy::Lenient => {
                    tracing::warn!(error = %e, "skipping release notes entry");
                    parsed.skipped.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(parsed)
    }

    async fn read_entry(&self, entry: NotesEntry) -> Result<LocalizedText, PublishError> {
        let resolved: PathBuf = self.locator.resolve(&entry.path);
        if !resolved.is_file() {
            return Err(PublishError::MalformedEntry {
                entry: format!("{}::{}", entry.language, entry.path),
                reason: format!(
                    "言語 \"{}\" のリリースノートが見つかりません: {}",
                    entry.language,
                    resolved.display()
                ),
            });
        }

        let text = fs::read_to_string(&resolved)
            .await
            .map_err(|e| PublishError::FileUnreadable {
                path: resolved.clone(),
                message: e.to_string(),
            })?;

        Ok(LocalizedText {
            language: entry.language,
            text,
        })
    }

    fn regex(pattern: &str) -> Result<Regex, PublishError> {
        Regex::new(pattern).map_err(|e| PublishError::ConfigError {
            message: e.to_string(),
        })
    }
}
