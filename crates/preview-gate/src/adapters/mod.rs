//! Embed adapters.
//!
//! Each adapter translates one embed's native protocol into the common
//! signal alphabet consumed by the gate controller:
//!
//! ```text
//! YouTube iframe  ── load ───────────────────────────┐
//! Stream iframe   ── propertyChange / play / pause ──┼──> Signal::{Play, Pause, ProgressSample}
//! Audio widget    ── playProgress / play / pause ────┘
//! ```
//!
//! Adapters never emit a sample lower than one they already emitted
//! (see [`SampleGuard`]). Initialisation failures switch an adapter to
//! [`TrackingMode::FallbackOnly`], where it assumes playback from load and
//! ignores further embed messages.
//!
//! # Modules
//!
//! - [`youtube`] - load-only adapter, fallback timer from the start
//! - [`stream`] - `currentTime` samples plus play/pause events
//! - [`audio`] - `playProgress` samples plus lifecycle events, ready deadline

pub mod audio;
pub mod stream;
pub mod youtube;

pub use audio::AudioWidgetAdapter;
pub use stream::StreamAdapter;
pub use youtube::YouTubeAdapter;

use crate::config::Config;
use crate::errors::AdapterError;
use crate::types::MediaKind;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Normalized playback signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Play,
    Pause,
    /// Authoritative playback position.
    ProgressSample(Duration),
}

/// How an adapter is currently accounting for playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    /// Embed events drive the clock; samples correct the fallback estimate.
    Authoritative,
    /// Only the fallback timer, started at load, drives the clock.
    FallbackOnly,
}

impl TrackingMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            TrackingMode::Authoritative => "authoritative",
            TrackingMode::FallbackOnly => "fallback_only",
        }
    }
}

/// Translates one embed's events into [`Signal`]s.
///
/// Implementations are exclusively owned by the session that serves them.
pub trait EventSource: Send + fmt::Debug {
    fn kind(&self) -> MediaKind;

    /// The exact origin whose messages are trusted.
    fn expected_origin(&self) -> &str;

    fn mode(&self) -> TrackingMode;

    /// The iframe fired its load/ready event.
    fn on_loaded(&mut self) -> Option<Signal>;

    /// Decode one message payload that already passed the origin check.
    fn translate(&mut self, data: &Value) -> Result<Option<Signal>, AdapterError>;

    /// The embed's script API is unavailable; degrade to fallback tracking.
    fn on_script_failed(&mut self, error: &AdapterError) -> Option<Signal>;

    /// Deadline after load by which the embed must report ready.
    fn ready_timeout(&self) -> Option<Duration> {
        None
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn accepts_origin(&self, origin: &str) -> bool {
        origin == self.expected_origin()
    }
}

/// Build the adapter for an embed kind.
#[must_use]
pub fn attach(kind: MediaKind, config: &Config) -> Box<dyn EventSource> {
    let origin = config.origin_for(kind).to_string();
    match kind {
        MediaKind::YouTube => Box::new(YouTubeAdapter::new(origin)),
        MediaKind::Stream => Box::new(StreamAdapter::new(origin)),
        MediaKind::Audio => Box::new(AudioWidgetAdapter::new(origin, config.audio_ready_timeout)),
    }
}

/// Keeps emitted samples non-decreasing.
///
/// A backward seek reports a lower position; it is clamped to the last value
/// instead of being propagated, so seeking back never buys more preview time.
#[derive(Debug, Default)]
pub struct SampleGuard {
    last: Option<Duration>,
    clamped: u64,
}

impl SampleGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the position to emit, or `None` for a regression.
    pub fn admit(&mut self, kind: MediaKind, position: Duration) -> Option<Duration> {
        match self.last {
            Some(last) if position < last => {
                self.clamped += 1;
                debug!(
                    target: "preview.adapter",
                    kind = kind.as_str(),
                    reported_ms = u64::try_from(position.as_millis()).unwrap_or(u64::MAX),
                    last_ms = u64::try_from(last.as_millis()).unwrap_or(u64::MAX),
                    "Clamped backward progress sample"
                );
                crate::observability::metrics::record_sample_clamped(kind.as_str());
                None
            }
            _ => {
                self.last = Some(position);
                Some(position)
            }
        }
    }

    #[must_use]
    pub fn last(&self) -> Option<Duration> {
        self.last
    }

    /// Number of regressions clamped so far.
    #[must_use]
    pub fn clamped(&self) -> u64 {
        self.clamped
    }
}

/// Convert an embed-reported position in seconds.
pub(crate) fn position_from_secs(seconds: f64) -> Result<Duration, AdapterError> {
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| AdapterError::MalformedMessage(format!("position {seconds}: {e}")))
}
