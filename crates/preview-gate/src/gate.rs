//! `GateController` - the preview state machine.
//!
//! ```text
//! Unstarted ──Play──> Playing <──Play/Pause──> Paused
//!     │                  │                        │
//!     └──────────────────┴── budget exhausted ────┴──> Gated (terminal)
//!
//! any state ──unmount──> Unmounted (terminal)
//! ```
//!
//! The gated transition runs its side effects exactly once: the clock is
//! frozen, the embed's source is cleared, and the lock callback is taken and
//! invoked. Every later signal or tick returns [`Outcome::Ignored`].
//!
//! A controller built [`with_cancel_token`](GateController::with_cancel_token)
//! checks the token before gating: once the owning view is torn down it moves
//! to `Unmounted` instead, with no side effects.
//!
//! The controller is synchronous and takes `now` explicitly; the session
//! actor supplies real (or paused test) time, the replay driver virtual time.

use crate::adapters::Signal;
use crate::clock::{PlaybackClock, SampleEffect};
use crate::embed::{EmbedControl, LockCallback};
use crate::policy::PreviewPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateState {
    Unstarted,
    Playing,
    Paused,
    Gated,
    Unmounted,
}

impl GateState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, GateState::Gated | GateState::Unmounted)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            GateState::Unstarted => "unstarted",
            GateState::Playing => "playing",
            GateState::Paused => "paused",
            GateState::Gated => "gated",
            GateState::Unmounted => "unmounted",
        }
    }
}

/// What made the gate fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCause {
    /// Zero budget; no playback was ever allowed.
    LockedAtMount,
    /// An embed signal pushed elapsed time over the budget.
    Signal,
    /// The fallback timer observed the budget running out.
    FallbackTick,
}

impl GateCause {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            GateCause::LockedAtMount => "locked_at_mount",
            GateCause::Signal => "signal",
            GateCause::FallbackTick => "fallback_tick",
        }
    }
}

/// Result of feeding the controller one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Terminal state; the input was dropped.
    Ignored,
    /// The input was applied and the session is still previewing.
    Applied,
    /// This input caused the gated transition.
    Gated(GateCause),
}

/// Advisory reading for a progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub state: GateState,
    pub elapsed: Duration,
    /// `None` when no limit applies.
    pub remaining: Option<Duration>,
}

pub struct GateController {
    state: GateState,
    clock: PlaybackClock,
    policy: PreviewPolicy,
    embed: Box<dyn EmbedControl>,
    on_preview_end: Option<LockCallback>,
    gated: Option<(Instant, GateCause)>,
    cancel_token: Option<CancellationToken>,
}

impl fmt::Debug for GateController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateController")
            .field("state", &self.state)
            .field("clock", &self.clock)
            .field("policy", &self.policy)
            .field("callback_pending", &self.on_preview_end.is_some())
            .field("gated", &self.gated)
            .finish_non_exhaustive()
    }
}

impl GateController {
    #[must_use]
    pub fn new(
        policy: PreviewPolicy,
        embed: Box<dyn EmbedControl>,
        on_preview_end: LockCallback,
    ) -> Self {
        Self {
            state: GateState::Unstarted,
            clock: PlaybackClock::new(),
            policy,
            embed,
            on_preview_end: Some(on_preview_end),
            gated: None,
            cancel_token: None,
        }
    }

    /// Tie the controller to its view's lifetime.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = Some(cancel_token);
        self
    }

    #[must_use]
    pub fn state(&self) -> GateState {
        self.state
    }

    #[must_use]
    pub fn policy(&self) -> &PreviewPolicy {
        &self.policy
    }

    /// When and why the gate fired, if it has.
    #[must_use]
    pub fn gated(&self) -> Option<(Instant, GateCause)> {
        self.gated
    }

    #[must_use]
    pub fn elapsed(&self, now: Instant) -> Duration {
        self.clock.current_elapsed(now)
    }

    #[must_use]
    pub fn snapshot(&self, now: Instant) -> PlaybackSnapshot {
        let elapsed = self.clock.current_elapsed(now);
        PlaybackSnapshot {
            state: self.state,
            elapsed,
            remaining: self.policy.remaining(elapsed),
        }
    }

    /// Mount-time check, run before any adapter is attached.
    ///
    /// A zero budget for a non-entitled viewer gates here, so the locked UI is
    /// rendered without a flash of playable content.
    pub fn mount(&mut self, now: Instant) -> Outcome {
        if self.state.is_terminal() {
            return Outcome::Ignored;
        }
        if self.policy.locked_at_mount() {
            return self.gate(now, GateCause::LockedAtMount);
        }
        Outcome::Applied
    }

    /// Apply one normalized signal.
    pub fn apply(&mut self, signal: Signal, now: Instant) -> Outcome {
        if self.state.is_terminal() {
            return Outcome::Ignored;
        }

        match signal {
            Signal::Play => {
                // Never start a segment that is already over budget
                if self.policy.should_gate(self.clock.current_elapsed(now)) {
                    return self.gate(now, GateCause::Signal);
                }
                self.clock.on_play(now);
                self.transition(GateState::Playing);
            }
            Signal::Pause => {
                self.clock.on_pause(now);
                if self.state == GateState::Playing {
                    self.transition(GateState::Paused);
                }
            }
            Signal::ProgressSample(position) => {
                let effect = self.clock.on_progress_sample(position, now);
                // Autoplay whose Play event never arrived
                if effect == SampleEffect::Advanced && self.state == GateState::Unstarted {
                    self.clock.on_play(now);
                    self.transition(GateState::Playing);
                }
            }
        }

        self.evaluate(now, GateCause::Signal)
    }

    /// Fallback timer tick: re-read the clock against the budget.
    pub fn tick(&mut self, now: Instant) -> Outcome {
        if self.state.is_terminal() {
            return Outcome::Ignored;
        }
        self.evaluate(now, GateCause::FallbackTick)
    }

    /// Tear down. No callback can fire afterwards.
    pub fn unmount(&mut self, now: Instant) -> Outcome {
        if self.state == GateState::Unmounted {
            return Outcome::Ignored;
        }
        self.clock.freeze(now);
        self.on_preview_end = None;
        self.transition(GateState::Unmounted);
        Outcome::Applied
    }

    fn evaluate(&mut self, now: Instant, cause: GateCause) -> Outcome {
        if self.policy.should_gate(self.clock.current_elapsed(now)) {
            self.gate(now, cause)
        } else {
            Outcome::Applied
        }
    }

    fn gate(&mut self, now: Instant, cause: GateCause) -> Outcome {
        if self.state.is_terminal() {
            return Outcome::Ignored;
        }
        if self
            .cancel_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            self.unmount(now);
            return Outcome::Ignored;
        }

        self.clock.freeze(now);
        self.transition(GateState::Gated);
        self.gated = Some((now, cause));

        self.embed.clear_source();
        if let Some(on_preview_end) = self.on_preview_end.take() {
            on_preview_end();
        }

        info!(
            target: "preview.gate",
            cause = cause.as_str(),
            elapsed_ms = u64::try_from(self.clock.committed().as_millis()).unwrap_or(u64::MAX),
            "Preview budget exhausted, player locked"
        );
        Outcome::Gated(cause)
    }

    fn transition(&mut self, next: GateState) {
        if self.state != next {
            debug!(
                target: "preview.gate",
                from = self.state.as_str(),
                to = next.as_str(),
                "Gate state transition"
            );
            self.state = next;
        }
    }
}
