//! State machine for tracking the edit session lifecycle
//!
//! The machine lives only for the duration of one publish operation and is
//! never persisted: an abandoned edit is not resumable.

use crate::core::error::PublishError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Edit session state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EditState {
    Unopened,
    Opened,
    ArtifactUploaded,
    SymbolsUploaded,
    ListingsUpdated,
    TracksAssigned,
    Committed,
    Failed,
}

impl EditState {
    /// Committed and Failed end the session
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Failed)
    }

    /// Check whether `to` may follow this state
    pub fn can_transition_to(self, to: EditState) -> bool {
        use EditState::*;

        if self.is_terminal() {
            return false;
        }
        if to == Failed {
            return true;
        }

        match self {
            Unopened => to == Opened,
            Opened => to == ArtifactUploaded,
            ArtifactUploaded => matches!(
                to,
                SymbolsUploaded | ListingsUpdated | TracksAssigned | Committed
            ),
            SymbolsUploaded => matches!(to, ListingsUpdated | TracksAssigned | Committed),
            ListingsUpdated => matches!(to, TracksAssigned | Committed),
            TracksAssigned => to == Committed,
            Committed | Failed => false,
        }
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateTransition {
    /// From state
    pub from: EditState,

    /// To state
    pub to: EditState,

    /// Timestamp
    pub timestamp: DateTime<Utc>,

    /// Short note (edit id, version code, track name, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// State machine for one edit session
#[derive(Debug, Clone)]
pub struct EditStateMachine {
    current_state: EditState,
    transitions: Vec<StateTransition>,
    error: Option<String>,
}

impl Default for EditStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl EditStateMachine {
    /// Create a new state machine in `Unopened`
    pub fn new() -> Self {
        Self {
            current_state: EditState::Unopened,
            transitions: Vec::new(),
            error: None,
        }
    }

    /// Transition to a new state
    ///
    /// Illegal transitions leave the machine untouched and return
    /// [`PublishError::InvalidTransition`].
    pub fn transition(&mut self, to: EditState, note: Option<String>) -> Result<(), PublishError> {
        let from = self.current_state;
        if !from.can_transition_to(to) {
            return Err(PublishError::InvalidTransition { from, to });
        }

        self.transitions.push(StateTransition {
            from,
            to,
            timestamp: Utc::now(),
            note,
        });
        self.current_state = to;

        Ok(())
    }

    /// Move to `Failed`, recording the error message
    ///
    /// No-op once the session is terminal.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.current_state.is_terminal() {
            return;
        }
        self.transitions.push(StateTransition {
            from: self.current_state,
            to: EditState::Failed,
            timestamp: Utc::now(),
            note: Some(message.clone()),
        });
        self.current_state = EditState::Failed;
        self.error = Some(message);
    }

    /// Get current state
    pub fn get_state(&self) -> EditState {
        self.current_state
    }

    /// Get recorded transitions
    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Get last error
    pub fn get_last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Get transition history as human-readable string
    pub fn get_history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| {
                let time = t.timestamp.to_rfc3339();
                let note = t
                    .note
                    .as_ref()
                    .map(|n| format!(" ({})", n))
                    .unwrap_or_default();
                format!("{}: {:?} → {:?}{}", time, t.from, t.to, note)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
