use image::DynamicImage;
use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

use crate::kernel::staging::{ArtifactId, StagedArtifact};

/// Seam to the embedding canvas. The core never touches drawing state
/// directly; every read and mutation goes through this trait so the
/// loop can be driven headless in tests.
pub trait CanvasHost: Send + Sync {
    /// Persistent identity of the open document. `None` means the
    /// board is ephemeral and must never be saved.
    fn document_id(&self) -> Option<Uuid>;

    /// Rasterize the visible board, excluding the given pending
    /// artifacts. `None` means the board has no visible content.
    fn render_viewport(&self, exclude: &HashSet<ArtifactId>) -> Option<DynamicImage>;

    /// Place a batch of assistant artifacts. `pending` batches render
    /// as ghost content awaiting review.
    fn apply_artifacts(&self, artifacts: &[StagedArtifact], pending: bool);

    /// Promote a pending artifact to permanent content.
    fn commit_artifact(&self, id: ArtifactId);

    /// Remove a pending artifact from the board.
    fn remove_artifact(&self, id: ArtifactId);

    /// Replace the entire document with collaborator data.
    fn replace_document(&self, data: &Value);

    /// Serialize the full document for persistence.
    fn export_data(&self) -> Value;
}
