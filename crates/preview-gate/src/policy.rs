//! `PreviewPolicy` - decides when playback must be gated.

use std::time::Duration;

/// Preview allowance for one session. Fixed at mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewBudget {
    /// No limit applies to this viewer.
    Unlimited,
    /// Seconds of actual playback before lock. Zero means locked at mount.
    Limited(Duration),
}

impl PreviewBudget {
    /// Budget from an optional whole number of seconds; unset means unlimited.
    #[must_use]
    pub fn from_seconds(seconds: Option<u32>) -> Self {
        match seconds {
            Some(s) => PreviewBudget::Limited(Duration::from_secs(u64::from(s))),
            None => PreviewBudget::Unlimited,
        }
    }

    #[must_use]
    pub fn limit(&self) -> Option<Duration> {
        match self {
            PreviewBudget::Unlimited => None,
            PreviewBudget::Limited(limit) => Some(*limit),
        }
    }
}

/// Budget and entitlement for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewPolicy {
    budget: PreviewBudget,
    entitled: bool,
}

impl PreviewPolicy {
    #[must_use]
    pub fn new(budget: PreviewBudget, entitled: bool) -> Self {
        Self { budget, entitled }
    }

    #[must_use]
    pub fn budget(&self) -> PreviewBudget {
        self.budget
    }

    #[must_use]
    pub fn is_entitled(&self) -> bool {
        self.entitled
    }

    /// Whether `elapsed` playing time exhausts the budget.
    #[must_use]
    pub fn should_gate(&self, elapsed: Duration) -> bool {
        if self.entitled {
            return false;
        }
        match self.budget {
            PreviewBudget::Unlimited => false,
            PreviewBudget::Limited(limit) => elapsed >= limit,
        }
    }

    /// A non-entitled viewer with a zero budget must render already locked.
    #[must_use]
    pub fn locked_at_mount(&self) -> bool {
        self.should_gate(Duration::ZERO)
    }

    /// Remaining preview time for a progress bar. `None` when no limit applies.
    #[must_use]
    pub fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        if self.entitled {
            return None;
        }
        self.budget
            .limit()
            .map(|limit| limit.saturating_sub(elapsed))
    }
}
