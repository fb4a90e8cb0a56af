use super::mode::AssistanceMode;

/// Threshold notices emitted as the budget runs down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetNotice {
    /// Fired when 2 or 1 hints remain after recording.
    Remaining(u32),
    /// Fired when the last hint is consumed.
    LimitReached,
}

/// Counts assistance events against an optional per-assignment limit.
/// `used` is monotonically non-decreasing within a session.
pub struct HintBudgetTracker {
    limit: Option<u32>,
    used: u32,
}

impl HintBudgetTracker {
    pub fn new(limit: Option<u32>) -> Self {
        Self { limit, used: 0 }
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|limit| limit.saturating_sub(self.used))
    }

    /// Record one assistance event. `Off` and `Quick` never count.
    /// Returns the updated count plus a threshold notice when the
    /// remaining budget falls to 2, 1, or 0.
    pub fn record_usage(&mut self, mode: AssistanceMode) -> (u32, Option<BudgetNotice>) {
        if !mode.is_remote() {
            return (self.used, None);
        }
        self.used += 1;

        let notice = self.limit.and_then(|limit| {
            match i64::from(limit) - i64::from(self.used) {
                0 => Some(BudgetNotice::LimitReached),
                rem @ (1 | 2) => Some(BudgetNotice::Remaining(rem as u32)),
                _ => None,
            }
        });
        (self.used, notice)
    }
}
