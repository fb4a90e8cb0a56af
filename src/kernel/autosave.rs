use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::debounce::DebounceTimer;
use super::event::{Notice, SessionEvent};
use super::staging::ArtifactId;
use crate::canvas::host::CanvasHost;
use crate::canvas::snapshot::CanvasSnapshotter;
use crate::services::assist::png_data_uri;
use crate::services::persist::{DocumentStore, PersistError, SavePayload};

/// Quiet period after the last edit before a save fires.
pub const SAVE_QUIET_MS: u64 = 2000;
/// Consecutive non-timeout failures before the user is warned.
pub const SAVE_FAILURE_NOTICE_THRESHOLD: u32 = 3;

/// Debounced persistence of the document. Saves trail edits by a quiet
/// window so rapid strokes coalesce into one write.
pub struct AutoSaveScheduler {
    timer: DebounceTimer,
    failures: u32,
}

impl AutoSaveScheduler {
    pub fn new(tx: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            timer: DebounceTimer::new(
                Duration::from_millis(SAVE_QUIET_MS),
                tx,
                || SessionEvent::SaveDue,
            ),
            failures: 0,
        }
    }

    /// Restart the save window. Callers must filter out self-inflicted
    /// edits before reaching here.
    pub fn notify_edit(&mut self) {
        self.timer.rearm();
    }

    /// Export and dispatch a save off the loop. Ephemeral and offline
    /// boards are skipped without consuming the dirty state.
    pub fn fire(
        &self,
        canvas: &dyn CanvasHost,
        snapshotter: &CanvasSnapshotter,
        exclude: &HashSet<ArtifactId>,
        online: bool,
        store: Arc<dyn DocumentStore>,
        tx: mpsc::Sender<SessionEvent>,
    ) {
        let Some(document_id) = canvas.document_id() else {
            debug!("save skipped: board is ephemeral");
            return;
        };
        if !online {
            info!("save skipped: offline");
            return;
        }

        let data = canvas.export_data();
        let preview = match snapshotter.capture(canvas, exclude) {
            Ok(Some(snapshot)) => Some(png_data_uri(&snapshot.png)),
            Ok(None) => None,
            Err(err) => {
                warn!("save preview capture failed: {err}");
                None
            }
        };
        let payload = SavePayload {
            data,
            preview,
            updated_at: Utc::now(),
        };

        tokio::spawn(async move {
            let result = store.update(document_id, payload).await;
            let _ = tx.send(SessionEvent::SaveFinished { result }).await;
        });
    }

    /// Fold a save result into the failure streak. Timeouts are
    /// transient and neither reset nor extend the streak.
    pub fn record_result(&mut self, result: &Result<(), PersistError>) -> Option<Notice> {
        match result {
            Ok(()) => {
                self.failures = 0;
                None
            }
            Err(PersistError::Timeout) => {
                warn!("save timed out; will retry on next edit");
                None
            }
            Err(err) => {
                self.failures += 1;
                warn!(failures = self.failures, "save failed: {err}");
                if self.failures == SAVE_FAILURE_NOTICE_THRESHOLD {
                    Some(Notice::SaveFailing)
                } else {
                    None
                }
            }
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }
}
