//! Audio widget adapter.
//!
//! Same dual-source pattern as the Stream iframe: `playProgress` carries the
//! authoritative position (milliseconds) and `play` / `pause` / `finish` drive
//! the fallback timer between samples.
//!
//! ```json
//! {"method": "ready"}
//! {"method": "playProgress", "value": {"currentPosition": 12400.0, "relativePosition": 0.1}}
//! ```
//!
//! The widget's script API can fail to initialise (blocked script, load-order
//! race). If the host reports that, or the widget does not say `ready` within
//! the ready timeout after load, the adapter switches to timer-only tracking
//! and assumes playback from load.

use super::{position_from_secs, EventSource, SampleGuard, Signal, TrackingMode};
use crate::errors::AdapterError;
use crate::types::MediaKind;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
enum WidgetMessage {
    Ready,
    Play,
    Pause,
    Finish,
    PlayProgress { value: PlayProgress },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayProgress {
    current_position: f64,
}

#[derive(Debug)]
pub struct AudioWidgetAdapter {
    origin: String,
    mode: TrackingMode,
    guard: SampleGuard,
    ready_timeout: Duration,
    ready: bool,
    loaded: bool,
}

impl AudioWidgetAdapter {
    #[must_use]
    pub fn new(origin: impl Into<String>, ready_timeout: Duration) -> Self {
        Self {
            origin: origin.into(),
            mode: TrackingMode::Authoritative,
            guard: SampleGuard::new(),
            ready_timeout,
            ready: false,
            loaded: false,
        }
    }
}

impl EventSource for AudioWidgetAdapter {
    fn kind(&self) -> MediaKind {
        MediaKind::Audio
    }

    fn expected_origin(&self) -> &str {
        &self.origin
    }

    fn mode(&self) -> TrackingMode {
        self.mode
    }

    fn on_loaded(&mut self) -> Option<Signal> {
        self.loaded = true;
        match self.mode {
            TrackingMode::Authoritative => None,
            TrackingMode::FallbackOnly => Some(Signal::Play),
        }
    }

    fn translate(&mut self, data: &Value) -> Result<Option<Signal>, AdapterError> {
        if self.mode == TrackingMode::FallbackOnly {
            return Ok(None);
        }

        let message = WidgetMessage::deserialize(data)
            .map_err(|e| AdapterError::MalformedMessage(e.to_string()))?;

        // Any well-formed widget message proves the API is alive
        if !self.ready {
            debug!(
                target: "preview.adapter",
                kind = "audio",
                "Audio widget API ready"
            );
            self.ready = true;
        }

        match message {
            WidgetMessage::Ready | WidgetMessage::Other => Ok(None),
            WidgetMessage::Play => Ok(Some(Signal::Play)),
            WidgetMessage::Pause | WidgetMessage::Finish => Ok(Some(Signal::Pause)),
            WidgetMessage::PlayProgress { value } => {
                let position = position_from_secs(value.current_position / 1000.0)?;
                Ok(self
                    .guard
                    .admit(MediaKind::Audio, position)
                    .map(Signal::ProgressSample))
            }
        }
    }

    fn on_script_failed(&mut self, error: &AdapterError) -> Option<Signal> {
        if self.mode == TrackingMode::FallbackOnly {
            return None;
        }
        warn!(
            target: "preview.adapter",
            kind = "audio",
            error = %error,
            "Audio widget API unavailable, falling back to timer-only tracking"
        );
        self.mode = TrackingMode::FallbackOnly;
        // Not loaded yet: on_loaded will start the timer
        self.loaded.then_some(Signal::Play)
    }

    fn ready_timeout(&self) -> Option<Duration> {
        match self.mode {
            TrackingMode::Authoritative if !self.ready => Some(self.ready_timeout),
            _ => None,
        }
    }

    fn is_ready(&self) -> bool {
        self.ready || self.mode == TrackingMode::FallbackOnly
    }
}
