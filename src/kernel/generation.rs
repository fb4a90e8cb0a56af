use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::mode::{AssignmentRestrictions, AssistanceMode, RequestSource};
use super::policy::AssistancePolicy;
use super::staging::ArtifactId;
use crate::canvas::host::CanvasHost;
use crate::canvas::snapshot::CanvasSnapshotter;
use crate::services::assist::{png_data_uri, Annotation, AssistRequestBody};

/// Monotonic identity of one generation attempt. Completions carrying a
/// stale id are discarded by the applier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoundId(pub u64);

/// Where the controller currently is in the capture/dispatch/apply
/// pipeline. Purely observational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundPhase {
    #[default]
    Idle,
    Capturing,
    Generating,
}

/// Mutual-exclusion flag for in-flight rounds. The lease releases on
/// drop, so an early return in the pipeline can never wedge the guard.
pub struct SessionGuard {
    held: Arc<AtomicBool>,
}

impl SessionGuard {
    pub fn new() -> Self {
        Self {
            held: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn try_acquire(&self) -> Option<GuardLease> {
        if self
            .held
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(GuardLease {
                held: Arc::clone(&self.held),
            })
        } else {
            None
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GuardLease {
    held: Arc<AtomicBool>,
}

impl Drop for GuardLease {
    fn drop(&mut self) {
        self.held.store(false, Ordering::SeqCst);
    }
}

/// What asked for a round, and with what overrides.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub mode: AssistanceMode,
    pub prompt: Option<String>,
    /// Explicit requests skip the unchanged-fingerprint check.
    pub forced: bool,
    pub source: RequestSource,
}

/// Everything the dispatcher needs to run one round off the loop.
pub struct RoundTicket {
    pub id: RoundId,
    pub body: AssistRequestBody,
    pub token: CancellationToken,
}

/// Book-keeping for the round currently out at the backend.
pub struct InFlightRound {
    pub id: RoundId,
    pub mode: AssistanceMode,
    pub source: RequestSource,
    pub prompt: Option<String>,
    pub fingerprint: u64,
    pub token: CancellationToken,
    _lease: GuardLease,
}

/// Result of asking the controller to begin a round.
pub enum RoundDecision {
    /// Dispatch this ticket to the backend.
    Dispatch(RoundTicket),
    /// The round resolved locally without a network call.
    NoOp(GenerationOutcome),
    /// Policy refused the effective mode.
    Rejected { reason: &'static str },
    /// Silently dropped (already busy, or voice owns the channel).
    Dropped,
}

/// Terminal state of the most recent round.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    NoOpEmptyCanvas,
    NoOpUnchanged,
    NoOpModeDisabled,
    Feedback {
        annotations: Vec<Annotation>,
        is_premium: bool,
        rendered_image: Option<String>,
    },
    Failed { reason: String },
    Cancelled,
}

/// Drives the lifecycle of generation rounds: capture, gate, dispatch,
/// and stale-completion filtering. Owns the last-processed fingerprint
/// that makes settle-triggered rounds idempotent.
pub struct GenerationController {
    next_round: u64,
    guard: SessionGuard,
    in_flight: Option<InFlightRound>,
    fingerprint: Option<u64>,
    phase: RoundPhase,
    last_outcome: Option<GenerationOutcome>,
}

impl GenerationController {
    pub fn new() -> Self {
        Self {
            next_round: 0,
            guard: SessionGuard::new(),
            in_flight: None,
            fingerprint: None,
            phase: RoundPhase::Idle,
            last_outcome: None,
        }
    }

    /// Run the pre-dispatch pipeline for a trigger. Cheap checks come
    /// before capture; capture comes before the guard so a no-op round
    /// never blocks a concurrent explicit request.
    pub fn try_begin(
        &mut self,
        trigger: Trigger,
        restrictions: &AssignmentRestrictions,
        voice_active: bool,
        canvas: &dyn CanvasHost,
        snapshotter: &CanvasSnapshotter,
        exclude: &HashSet<ArtifactId>,
    ) -> RoundDecision {
        if self.guard.is_held() {
            debug!("round dropped: generation already in flight");
            return RoundDecision::Dropped;
        }
        if !trigger.mode.is_remote() {
            return self.settle_noop(GenerationOutcome::NoOpModeDisabled);
        }
        if voice_active && trigger.source == RequestSource::Auto {
            debug!("round dropped: voice session owns the channel");
            return RoundDecision::Dropped;
        }

        self.phase = RoundPhase::Capturing;
        let snapshot = match snapshotter.capture(canvas, exclude) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                return self.settle_noop(GenerationOutcome::NoOpEmptyCanvas);
            }
            Err(err) => {
                return self.settle_noop(GenerationOutcome::Failed {
                    reason: err.to_string(),
                });
            }
        };

        if !trigger.forced && self.fingerprint == Some(snapshot.fingerprint) {
            debug!(fingerprint = snapshot.fingerprint, "round skipped: board unchanged");
            return self.settle_noop(GenerationOutcome::NoOpUnchanged);
        }

        let Some(lease) = self.guard.try_acquire() else {
            return RoundDecision::Dropped;
        };

        let decision = AssistancePolicy::resolve(trigger.mode, restrictions);
        if let Some(reason) = decision.reason {
            self.phase = RoundPhase::Idle;
            drop(lease);
            return RoundDecision::Rejected { reason };
        }
        let effective = decision.effective;
        if !effective.is_remote() {
            drop(lease);
            return self.settle_noop(GenerationOutcome::NoOpModeDisabled);
        }

        self.next_round += 1;
        let id = RoundId(self.next_round);
        let token = CancellationToken::new();
        let body = AssistRequestBody {
            image: png_data_uri(&snapshot.png),
            mode: effective,
            is_socratic: restrictions.socratic_mode,
            prompt: trigger.prompt.clone(),
            source: trigger.source,
        };
        self.in_flight = Some(InFlightRound {
            id,
            mode: effective,
            source: trigger.source,
            prompt: trigger.prompt,
            fingerprint: snapshot.fingerprint,
            token: token.clone(),
            _lease: lease,
        });
        self.phase = RoundPhase::Generating;
        debug!(round = id.0, mode = effective.as_str(), "round dispatched");
        RoundDecision::Dispatch(RoundTicket { id, body, token })
    }

    /// Tear down the in-flight round, if any. Returns whether one was
    /// actually cancelled.
    pub fn cancel_in_flight(&mut self) -> bool {
        match self.in_flight.take() {
            Some(flight) => {
                flight.token.cancel();
                self.phase = RoundPhase::Idle;
                self.last_outcome = Some(GenerationOutcome::Cancelled);
                debug!(round = flight.id.0, "round cancelled");
                true
            }
            None => false,
        }
    }

    /// Claim a completion. Stale or cancelled rounds yield `None` and
    /// their results must be discarded by the caller.
    pub fn finish(&mut self, round: RoundId) -> Option<InFlightRound> {
        match &self.in_flight {
            Some(flight) if flight.id == round && !flight.token.is_cancelled() => {
                self.phase = RoundPhase::Idle;
                self.in_flight.take()
            }
            _ => {
                debug!(round = round.0, "stale round completion discarded");
                None
            }
        }
    }

    /// Record the fingerprint of a board state whose feedback has been
    /// delivered, so an identical settle produces no new round.
    pub fn mark_processed(&mut self, fingerprint: u64) {
        self.fingerprint = Some(fingerprint);
    }

    pub fn record_outcome(&mut self, outcome: GenerationOutcome) {
        self.last_outcome = Some(outcome);
    }

    pub fn is_busy(&self) -> bool {
        self.guard.is_held()
    }

    pub fn last_fingerprint(&self) -> Option<u64> {
        self.fingerprint
    }

    pub fn last_outcome(&self) -> Option<&GenerationOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    fn settle_noop(&mut self, outcome: GenerationOutcome) -> RoundDecision {
        self.phase = RoundPhase::Idle;
        self.last_outcome = Some(outcome.clone());
        RoundDecision::NoOp(outcome)
    }
}

impl Default for GenerationController {
    fn default() -> Self {
        Self::new()
    }
}
