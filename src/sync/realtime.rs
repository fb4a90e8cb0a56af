use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::canvas::host::CanvasHost;
use crate::kernel::generation::GenerationController;

/// Applies collaborator document replacements. Conflict resolution is
/// last-writer-wins: the incoming document overwrites local state
/// wholesale, and any in-flight generation round is torn down because
/// its snapshot no longer describes the board.
pub struct RealtimeSyncBridge;

impl RealtimeSyncBridge {
    /// Returns whether the replacement was applied.
    pub fn apply(
        canvas: &dyn CanvasHost,
        controller: &mut GenerationController,
        document_id: Uuid,
        data: &Value,
    ) -> bool {
        if is_empty_payload(data) {
            debug!("remote replace ignored: empty payload");
            return false;
        }
        match canvas.document_id() {
            Some(local) if local == document_id => {}
            _ => {
                debug!(%document_id, "remote replace ignored: document mismatch");
                return false;
            }
        }

        if controller.cancel_in_flight() {
            info!("remote replace cancelled in-flight round");
        }
        canvas.replace_document(data);
        true
    }
}

fn is_empty_payload(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
