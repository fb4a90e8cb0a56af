use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The assistance modes a learner can select on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistanceMode {
    /// No assistance.
    Off,
    /// Resolved by a local synchronous solver; never dispatched remotely.
    Quick,
    /// Observational feedback. Committed without review.
    Feedback,
    /// Next-step suggestions. Staged for accept/reject.
    Suggest,
    /// Full solutions. Staged for accept/reject.
    Answer,
}

impl AssistanceMode {
    /// Modes that reach the remote assistance backend.
    pub fn is_remote(self) -> bool {
        matches!(self, Self::Feedback | Self::Suggest | Self::Answer)
    }

    /// Staged modes require human confirmation before committing,
    /// because they risk revealing answers.
    pub fn requires_review(self) -> bool {
        matches!(self, Self::Suggest | Self::Answer)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Quick => "quick",
            Self::Feedback => "feedback",
            Self::Suggest => "suggest",
            Self::Answer => "answer",
        }
    }
}

/// Origin of a generation request, carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestSource {
    /// Debounce-triggered.
    Auto,
    /// Explicitly authorized by a live voice session.
    Voice,
}

impl RequestSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Voice => "voice",
        }
    }
}

/// Per-assignment restrictions, supplied once at session start.
/// Read-only to the orchestration core.
#[derive(Debug, Clone)]
pub struct AssignmentRestrictions {
    pub allow_ai: bool,
    pub allowed_modes: HashSet<AssistanceMode>,
    pub hint_limit: Option<u32>,
    pub socratic_mode: bool,
}

impl Default for AssignmentRestrictions {
    fn default() -> Self {
        Self {
            allow_ai: true,
            allowed_modes: [
                AssistanceMode::Feedback,
                AssistanceMode::Suggest,
                AssistanceMode::Answer,
            ]
            .into_iter()
            .collect(),
            hint_limit: None,
            socratic_mode: false,
        }
    }
}
