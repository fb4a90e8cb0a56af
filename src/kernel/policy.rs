use super::mode::{AssignmentRestrictions, AssistanceMode};

pub const REASON_AI_DISABLED: &str = "AI assistance is disabled for this assignment";
pub const REASON_MODE_NOT_ALLOWED: &str = "mode not allowed for this assignment";

/// Outcome of policy resolution. `effective` is what actually runs,
/// possibly downgraded to `Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyDecision {
    pub effective: AssistanceMode,
    pub rejected: bool,
    pub reason: Option<&'static str>,
}

impl PolicyDecision {
    fn pass(effective: AssistanceMode) -> Self {
        Self {
            effective,
            rejected: false,
            reason: None,
        }
    }

    fn reject(reason: &'static str) -> Self {
        Self {
            effective: AssistanceMode::Off,
            rejected: true,
            reason: Some(reason),
        }
    }
}

/// The policy gate between a requested mode and the remote dispatch.
/// Pure function of (requested mode, restrictions); no hidden state.
pub struct AssistancePolicy;

impl AssistancePolicy {
    pub fn resolve(
        requested: AssistanceMode,
        restrictions: &AssignmentRestrictions,
    ) -> PolicyDecision {
        use AssistanceMode::*;

        match requested {
            // Quick is handled by the local solver; never gated here.
            Quick => PolicyDecision::pass(Quick),
            Off => PolicyDecision::pass(Off),
            _ if !restrictions.allow_ai => PolicyDecision::reject(REASON_AI_DISABLED),
            mode if !restrictions.allowed_modes.contains(&mode) => {
                PolicyDecision::reject(REASON_MODE_NOT_ALLOWED)
            }
            mode => PolicyDecision::pass(mode),
        }
    }
}
