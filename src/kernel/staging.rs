use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::mode::AssistanceMode;
use crate::services::assist::Annotation;

/// Identity of a canvas artifact produced by the assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub Uuid);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

/// Which side of the learner's work an annotation renders on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Placement alternates by response index: even index renders right.
pub fn placement_for(index: usize) -> Side {
    if index % 2 == 0 {
        Side::Right
    } else {
        Side::Left
    }
}

/// Assistant output placed on the canvas. `Pending` artifacts are ghost
/// content awaiting explicit accept/reject.
#[derive(Debug, Clone)]
pub struct StagedArtifact {
    pub id: ArtifactId,
    pub origin_mode: AssistanceMode,
    pub annotation: Annotation,
    pub side: Side,
    pub created_at: DateTime<Utc>,
}

/// Build a placed batch from a response, preserving order.
pub fn place_batch(annotations: Vec<Annotation>, mode: AssistanceMode) -> Vec<StagedArtifact> {
    let created_at = Utc::now();
    annotations
        .into_iter()
        .enumerate()
        .map(|(index, annotation)| StagedArtifact {
            id: ArtifactId::new(),
            origin_mode: mode,
            annotation,
            side: placement_for(index),
            created_at,
        })
        .collect()
}

/// Tracks assistant artifacts that are not yet committed to the
/// document.
///
/// Invariant: a `Pending` artifact is always excluded from snapshot
/// capture, so staging or un-staging an artifact can never change the
/// computed fingerprint of the board.
#[derive(Default)]
pub struct StagingManager {
    pending: HashMap<ArtifactId, StagedArtifact>,
}

impl StagingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a response for review. Returns the placed batch in
    /// response order.
    pub fn stage(
        &mut self,
        annotations: Vec<Annotation>,
        mode: AssistanceMode,
    ) -> Vec<StagedArtifact> {
        let batch = place_batch(annotations, mode);
        for artifact in &batch {
            self.pending.insert(artifact.id, artifact.clone());
        }
        batch
    }

    /// Accept: the artifact leaves the pending set and becomes
    /// permanent content.
    pub fn accept(&mut self, id: ArtifactId) -> Option<StagedArtifact> {
        self.pending.remove(&id)
    }

    /// Reject: the artifact leaves the pending set and is discarded.
    pub fn reject(&mut self, id: ArtifactId) -> Option<StagedArtifact> {
        self.pending.remove(&id)
    }

    pub fn is_pending(&self, id: ArtifactId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_ids(&self) -> HashSet<ArtifactId> {
        self.pending.keys().copied().collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
