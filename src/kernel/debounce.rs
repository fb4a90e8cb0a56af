use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::event::SessionEvent;

/// Quiet period before a settle signal fires.
pub const QUIET_PERIOD_MS: u64 = 2000;

/// Single-shot timer re-armed on each qualifying event. The pending
/// sleep task is aborted on re-arm, so only the last window fires.
pub struct DebounceTimer {
    quiet: Duration,
    tx: mpsc::Sender<SessionEvent>,
    make_event: fn() -> SessionEvent,
    pending: Option<JoinHandle<()>>,
}

impl DebounceTimer {
    pub fn new(
        quiet: Duration,
        tx: mpsc::Sender<SessionEvent>,
        make_event: fn() -> SessionEvent,
    ) -> Self {
        Self {
            quiet,
            tx,
            make_event,
            pending: None,
        }
    }

    /// Restart the quiet-period window.
    pub fn rearm(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let tx = self.tx.clone();
        let quiet = self.quiet;
        let make_event = self.make_event;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let _ = tx.send(make_event()).await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Watches the stream of user edits and emits a single `Settled` event
/// once the board has been quiet for the full window.
pub struct ActivityDebouncer {
    timer: DebounceTimer,
}

impl ActivityDebouncer {
    pub fn new(tx: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            timer: DebounceTimer::new(
                Duration::from_millis(QUIET_PERIOD_MS),
                tx,
                || SessionEvent::Settled,
            ),
        }
    }

    /// Self-inflicted edits (staging, commits, realtime replaces) never
    /// reset the window; that would let the core re-trigger itself.
    pub fn notify_edit(&mut self, self_inflicted: bool) {
        if self_inflicted {
            return;
        }
        self.timer.rearm();
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }
}
