use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::autosave::AutoSaveScheduler;
use super::budget::{BudgetNotice, HintBudgetTracker};
use super::debounce::ActivityDebouncer;
use super::event::{Notice, SessionEvent};
use super::generation::{
    GenerationController, GenerationOutcome, RoundDecision, RoundId, RoundTicket, Trigger,
};
use super::mode::{AssignmentRestrictions, AssistanceMode, RequestSource};
use super::staging::{place_batch, StagingManager};
use super::status::{BoardStatus, ERROR_CLEAR_MS, SUCCESS_CLEAR_MS};
use crate::canvas::host::CanvasHost;
use crate::canvas::snapshot::CanvasSnapshotter;
use crate::services::assist::{AssistError, AssistanceBackend, AssistanceReply};
use crate::services::persist::DocumentStore;
use crate::services::usage::{UsageReport, UsageReporter};
use crate::sync::realtime::RealtimeSyncBridge;

const EVENT_QUEUE_DEPTH: usize = 100;
const NOTICE_QUEUE_DEPTH: usize = 16;

/// Per-session policy and identity, fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub restrictions: AssignmentRestrictions,
    pub initial_mode: AssistanceMode,
    pub assignment_id: Option<Uuid>,
    pub submission_id: Option<Uuid>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restrictions: AssignmentRestrictions::default(),
            initial_mode: AssistanceMode::Suggest,
            assignment_id: None,
            submission_id: None,
        }
    }
}

/// The orchestration loop. Owns every piece of session state and is
/// the only writer: edits, timers, network completions, and remote
/// pushes all arrive as events on one queue, so no two transitions of
/// the same state machine ever interleave.
pub struct Session {
    config: SessionConfig,
    canvas: Arc<dyn CanvasHost>,
    backend: Arc<dyn AssistanceBackend>,
    store: Arc<dyn DocumentStore>,
    usage: Option<UsageReporter>,

    mode: AssistanceMode,
    voice_active: bool,
    online: bool,

    rx: mpsc::Receiver<SessionEvent>,
    tx: mpsc::Sender<SessionEvent>,

    debouncer: ActivityDebouncer,
    autosave: AutoSaveScheduler,
    snapshotter: CanvasSnapshotter,
    pub controller: GenerationController,
    pub staging: StagingManager,
    pub budget: HintBudgetTracker,

    status_seq: u64,
    status_tx: watch::Sender<BoardStatus>,
    notice_tx: mpsc::Sender<Notice>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        canvas: Arc<dyn CanvasHost>,
        backend: Arc<dyn AssistanceBackend>,
        store: Arc<dyn DocumentStore>,
    ) -> (Self, SessionHandle, mpsc::Receiver<Notice>) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (status_tx, status_rx) = watch::channel(BoardStatus::Idle);
        let (notice_tx, notice_rx) = mpsc::channel(NOTICE_QUEUE_DEPTH);

        let session = Self {
            mode: config.initial_mode,
            budget: HintBudgetTracker::new(config.restrictions.hint_limit),
            config,
            canvas,
            backend,
            store,
            usage: None,
            voice_active: false,
            online: true,
            debouncer: ActivityDebouncer::new(tx.clone()),
            autosave: AutoSaveScheduler::new(tx.clone()),
            snapshotter: CanvasSnapshotter::new(),
            controller: GenerationController::new(),
            staging: StagingManager::new(),
            status_seq: 0,
            status_tx,
            notice_tx,
            rx,
            tx: tx.clone(),
        };
        let handle = SessionHandle { tx, status_rx };
        (session, handle, notice_rx)
    }

    pub fn with_usage_reporter(mut self, reporter: UsageReporter) -> Self {
        self.usage = Some(reporter);
        self
    }

    pub fn mode(&self) -> AssistanceMode {
        self.mode
    }

    /// Drive the loop until every handle is dropped.
    pub async fn run(mut self) {
        info!("session loop started");
        while self.step().await {}
        info!("session loop stopped");
    }

    /// Process one event. Returns false once the queue is closed.
    pub async fn step(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => {
                self.handle_event(event).await;
                true
            }
            None => false,
        }
    }

    pub async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Edit { self_inflicted } => {
                if self_inflicted {
                    return;
                }
                // New input invalidates whatever the assistant was
                // looking at.
                self.controller.cancel_in_flight();
                self.debouncer.notify_edit(false);
                self.autosave.notify_edit();
            }
            SessionEvent::Settled => {
                self.begin_round(Trigger {
                    mode: self.mode,
                    prompt: None,
                    forced: false,
                    source: RequestSource::Auto,
                })
                .await;
            }
            SessionEvent::Assist {
                mode,
                prompt,
                source,
            } => {
                self.begin_round(Trigger {
                    mode: mode.unwrap_or(self.mode),
                    prompt,
                    forced: true,
                    source,
                })
                .await;
            }
            SessionEvent::RoundCompleted { round, result } => {
                self.apply_round(round, result).await;
            }
            SessionEvent::Accept(id) => {
                if let Some(artifact) = self.staging.accept(id) {
                    self.canvas.commit_artifact(artifact.id);
                    debug!(artifact = %artifact.id.0, "artifact accepted");
                }
            }
            SessionEvent::Reject(id) => {
                if let Some(artifact) = self.staging.reject(id) {
                    self.canvas.remove_artifact(artifact.id);
                    debug!(artifact = %artifact.id.0, "artifact rejected");
                }
            }
            SessionEvent::SetMode(mode) => {
                self.mode = mode;
            }
            SessionEvent::VoiceControl(active) => {
                self.voice_active = active;
            }
            SessionEvent::SetOnline(online) => {
                self.online = online;
            }
            SessionEvent::RemoteReplace { document_id, data } => {
                // Deliberately does not touch the debouncer or the
                // save timer: a collaborator's write must not make
                // this session answer or re-save it.
                RealtimeSyncBridge::apply(
                    self.canvas.as_ref(),
                    &mut self.controller,
                    document_id,
                    &data,
                );
            }
            SessionEvent::SaveDue => {
                let exclude = self.staging.pending_ids();
                self.autosave.fire(
                    self.canvas.as_ref(),
                    &self.snapshotter,
                    &exclude,
                    self.online,
                    Arc::clone(&self.store),
                    self.tx.clone(),
                );
            }
            SessionEvent::SaveFinished { result } => {
                if let Some(notice) = self.autosave.record_result(&result) {
                    let _ = self.notice_tx.send(notice).await;
                }
            }
            SessionEvent::StatusExpired { seq } => {
                if seq == self.status_seq && *self.status_tx.borrow() != BoardStatus::Idle {
                    self.status_tx.send_replace(BoardStatus::Idle);
                }
            }
        }
    }

    async fn begin_round(&mut self, trigger: Trigger) {
        let exclude = self.staging.pending_ids();
        let decision = self.controller.try_begin(
            trigger,
            &self.config.restrictions,
            self.voice_active,
            self.canvas.as_ref(),
            &self.snapshotter,
            &exclude,
        );
        match decision {
            RoundDecision::Dispatch(ticket) => self.dispatch(ticket),
            RoundDecision::Rejected { reason } => {
                info!(reason, "assistance request rejected by policy");
                let _ = self
                    .notice_tx
                    .send(Notice::PolicyRejected {
                        reason: reason.to_string(),
                    })
                    .await;
            }
            RoundDecision::NoOp(outcome) => {
                debug!(?outcome, "round resolved without dispatch");
            }
            RoundDecision::Dropped => {}
        }
    }

    /// Run the backend call off the loop, racing it against the
    /// round's cancellation token. The completion comes back as an
    /// event so the applier runs serialized with everything else.
    fn dispatch(&self, ticket: RoundTicket) {
        let RoundTicket { id, body, token } = ticket;
        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => Err(AssistError::Cancelled),
                result = backend.request(body) => result,
            };
            let _ = tx
                .send(SessionEvent::RoundCompleted { round: id, result })
                .await;
        });
    }

    async fn apply_round(&mut self, round: RoundId, result: Result<AssistanceReply, AssistError>) {
        // A cancelled or superseded round no longer owns the board;
        // its result is dropped here, not just at the network layer.
        let Some(flight) = self.controller.finish(round) else {
            return;
        };

        match result {
            Ok(reply) => {
                self.controller.mark_processed(flight.fingerprint);
                let annotations = reply.feedback.annotations;
                if annotations.is_empty() {
                    // The assistant looked and had nothing to add.
                    // Fingerprint stays updated so the same board is
                    // not re-asked.
                    debug!(round = round.0, "assistance round returned no annotations");
                    self.controller.record_outcome(GenerationOutcome::Feedback {
                        annotations: Vec::new(),
                        is_premium: reply.is_premium,
                        rendered_image: reply.image_url,
                    });
                    return;
                }

                let mode = flight.mode;
                if mode.requires_review() {
                    let batch = self.staging.stage(annotations.clone(), mode);
                    self.canvas.apply_artifacts(&batch, true);
                } else {
                    let batch = place_batch(annotations.clone(), mode);
                    self.canvas.apply_artifacts(&batch, false);
                }

                let (used, budget_notice) = self.budget.record_usage(mode);
                debug!(round = round.0, used, "assistance round applied");
                if let Some(notice) = budget_notice {
                    let notice = match notice {
                        BudgetNotice::Remaining(n) => Notice::HintsRemaining(n),
                        BudgetNotice::LimitReached => Notice::HintLimitReached,
                    };
                    let _ = self.notice_tx.send(notice).await;
                }

                if let Some(reporter) = &self.usage {
                    reporter.report(UsageReport {
                        submission_id: self.config.submission_id,
                        assignment_id: self.config.assignment_id,
                        mode,
                        prompt: flight.prompt.clone(),
                        ai_response: (!reply.text_content.is_empty())
                            .then(|| reply.text_content.clone()),
                    });
                }

                self.controller.record_outcome(GenerationOutcome::Feedback {
                    annotations,
                    is_premium: reply.is_premium,
                    rendered_image: reply.image_url,
                });
                self.set_status(
                    BoardStatus::Success,
                    Some(Duration::from_millis(SUCCESS_CLEAR_MS)),
                );
            }
            Err(AssistError::Cancelled) => {
                self.controller.record_outcome(GenerationOutcome::Cancelled);
            }
            Err(err) => {
                warn!(round = round.0, "assistance round failed: {err}");
                self.controller.record_outcome(GenerationOutcome::Failed {
                    reason: err.to_string(),
                });
                self.set_status(
                    BoardStatus::Error(err.to_string()),
                    Some(Duration::from_millis(ERROR_CLEAR_MS)),
                );
            }
        }
    }

    /// Publish a status and schedule its expiry. The sequence number
    /// keeps an old expiry from clearing a newer status.
    fn set_status(&mut self, status: BoardStatus, clear_after: Option<Duration>) {
        self.status_seq += 1;
        self.status_tx.send_replace(status);
        if let Some(delay) = clear_after {
            let tx = self.tx.clone();
            let seq = self.status_seq;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(SessionEvent::StatusExpired { seq }).await;
            });
        }
    }
}

/// Cloneable surface handed to the embedding UI. Everything funnels
/// into the session's event queue.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionEvent>,
    status_rx: watch::Receiver<BoardStatus>,
}

impl SessionHandle {
    pub async fn notify_edit(&self, self_inflicted: bool) {
        let _ = self
            .tx
            .send(SessionEvent::Edit { self_inflicted })
            .await;
    }

    pub async fn request_assist(
        &self,
        mode: Option<AssistanceMode>,
        prompt: Option<String>,
        source: RequestSource,
    ) {
        let _ = self
            .tx
            .send(SessionEvent::Assist {
                mode,
                prompt,
                source,
            })
            .await;
    }

    pub async fn accept(&self, id: super::staging::ArtifactId) {
        let _ = self.tx.send(SessionEvent::Accept(id)).await;
    }

    pub async fn reject(&self, id: super::staging::ArtifactId) {
        let _ = self.tx.send(SessionEvent::Reject(id)).await;
    }

    pub async fn set_mode(&self, mode: AssistanceMode) {
        let _ = self.tx.send(SessionEvent::SetMode(mode)).await;
    }

    pub async fn set_voice_active(&self, active: bool) {
        let _ = self.tx.send(SessionEvent::VoiceControl(active)).await;
    }

    pub async fn set_online(&self, online: bool) {
        let _ = self.tx.send(SessionEvent::SetOnline(online)).await;
    }

    pub async fn remote_replace(&self, document_id: Uuid, data: serde_json::Value) {
        let _ = self
            .tx
            .send(SessionEvent::RemoteReplace { document_id, data })
            .await;
    }

    /// Current board status. Callers can also `changed().await` on a
    /// cloned receiver to observe transitions.
    pub fn status(&self) -> BoardStatus {
        self.status_rx.borrow().clone()
    }

    pub fn status_receiver(&self) -> watch::Receiver<BoardStatus> {
        self.status_rx.clone()
    }
}
