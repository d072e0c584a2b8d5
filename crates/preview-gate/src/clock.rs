//! `PlaybackClock` - accumulates elapsed *playing* time.
//!
//! Two kinds of input feed the clock:
//!
//! - **Play / Pause**: wall-clock segments between a Play and the next Pause.
//!   This is the fallback estimate and the only input some embeds provide.
//! - **Progress samples**: authoritative positions reported by the embed.
//!   They correct the estimate upward and never move it backward.
//!
//! Reads are always "as of now": a segment still in flight is included.
//!
//! # Invariants
//!
//! - `current_elapsed` is non-decreasing for non-decreasing `now`
//! - Nothing mutates the clock once it is frozen
//! - Duplicate Play, Pause or sample delivery never double-counts time

use std::time::Duration;
use tokio::time::Instant;

/// Elapsed playing-time accumulator owned by one gate controller.
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    /// Committed playing time, excluding any in-flight segment.
    elapsed: Duration,
    /// Start of the in-flight segment; `None` while not playing.
    resumed_at: Option<Instant>,
    /// Set at the gated or unmounted transition.
    frozen: bool,
}

/// Effect of an authoritative sample on the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEffect {
    /// The sample moved elapsed time forward.
    Advanced,
    /// The estimate was already at or past the sample.
    Absorbed,
    /// The clock is frozen.
    Ignored,
}

impl PlaybackClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.resumed_at.is_some()
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Committed playing time, not counting the in-flight segment.
    #[must_use]
    pub fn committed(&self) -> Duration {
        self.elapsed
    }

    /// Start a playing segment. Idempotent while already playing.
    pub fn on_play(&mut self, now: Instant) {
        if self.frozen || self.resumed_at.is_some() {
            return;
        }
        self.resumed_at = Some(now);
    }

    /// Close the playing segment. Idempotent while already paused.
    pub fn on_pause(&mut self, now: Instant) {
        if self.frozen {
            return;
        }
        if let Some(started) = self.resumed_at.take() {
            self.elapsed = self
                .elapsed
                .saturating_add(now.saturating_duration_since(started));
        }
    }

    /// Merge an authoritative sample.
    ///
    /// The in-flight segment is folded in first, so a sample that already
    /// covers it is not counted twice, then `elapsed = max(elapsed, position)`.
    pub fn on_progress_sample(&mut self, position: Duration, now: Instant) -> SampleEffect {
        if self.frozen {
            return SampleEffect::Ignored;
        }
        self.fold_in_flight(now);
        if position > self.elapsed {
            self.elapsed = position;
            SampleEffect::Advanced
        } else {
            SampleEffect::Absorbed
        }
    }

    /// Elapsed playing time as of `now`.
    #[must_use]
    pub fn current_elapsed(&self, now: Instant) -> Duration {
        match self.resumed_at {
            Some(started) => self
                .elapsed
                .saturating_add(now.saturating_duration_since(started)),
            None => self.elapsed,
        }
    }

    /// Fold the in-flight segment and refuse all further mutation.
    pub fn freeze(&mut self, now: Instant) {
        if self.frozen {
            return;
        }
        self.on_pause(now);
        self.frozen = true;
    }

    fn fold_in_flight(&mut self, now: Instant) {
        if let Some(started) = self.resumed_at {
            self.elapsed = self
                .elapsed
                .saturating_add(now.saturating_duration_since(started));
            self.resumed_at = Some(now.max(started));
        }
    }
}
