use serde_json::Value;
use uuid::Uuid;

use super::generation::RoundId;
use super::mode::{AssistanceMode, RequestSource};
use super::staging::ArtifactId;
use crate::services::assist::{AssistError, AssistanceReply};
use crate::services::persist::PersistError;

/// Everything that can happen to a session. All state transitions flow
/// through this enum so the event loop is the single writer.
#[derive(Debug)]
pub enum SessionEvent {
    /// A canvas mutation. Self-inflicted edits (staging, commits,
    /// realtime replaces) never re-arm timers.
    Edit { self_inflicted: bool },
    /// The board has been quiet for the full debounce window.
    Settled,
    /// Explicit assistance request from the embedding UI or voice.
    Assist {
        mode: Option<AssistanceMode>,
        prompt: Option<String>,
        source: RequestSource,
    },
    /// A spawned generation task finished (or was torn down).
    RoundCompleted {
        round: RoundId,
        result: Result<AssistanceReply, AssistError>,
    },
    Accept(ArtifactId),
    Reject(ArtifactId),
    SetMode(AssistanceMode),
    VoiceControl(bool),
    SetOnline(bool),
    /// Full document replacement pushed by a collaborator.
    RemoteReplace { document_id: Uuid, data: Value },
    /// The autosave quiet window elapsed.
    SaveDue,
    SaveFinished { result: Result<(), PersistError> },
    /// A transient status display reached its expiry. Stale sequence
    /// numbers are ignored.
    StatusExpired { seq: u64 },
}

/// User-facing notifications surfaced outside the status channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    PolicyRejected { reason: String },
    HintsRemaining(u32),
    HintLimitReached,
    SaveFailing,
}
