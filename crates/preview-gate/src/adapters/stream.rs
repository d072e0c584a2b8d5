//! Stream iframe adapter.
//!
//! Two message families arrive from the video-delivery iframe:
//!
//! - `propertyChange` with `property: "currentTime"`: the authoritative
//!   position in seconds, emitted as `ProgressSample`
//! - `event` with `eventName: play | playing | pause | waiting | ended`:
//!   lifecycle events that drive the fallback timer between sparse samples
//!
//! ```json
//! {"__privateUnstableMessageType": "propertyChange", "property": "currentTime", "value": 12.4}
//! {"__privateUnstableMessageType": "event", "eventName": "pause"}
//! ```

use super::{position_from_secs, EventSource, SampleGuard, Signal, TrackingMode};
use crate::errors::AdapterError;
use crate::types::MediaKind;
use serde::Deserialize;
use serde_json::Value;
use tracing::{trace, warn};

#[derive(Debug, Deserialize)]
#[serde(tag = "__privateUnstableMessageType", rename_all = "camelCase")]
enum StreamMessage {
    PropertyChange {
        property: String,
        #[serde(default)]
        value: Value,
    },
    Event {
        #[serde(rename = "eventName")]
        event_name: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug)]
pub struct StreamAdapter {
    origin: String,
    mode: TrackingMode,
    guard: SampleGuard,
    loaded: bool,
}

impl StreamAdapter {
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            mode: TrackingMode::Authoritative,
            guard: SampleGuard::new(),
            loaded: false,
        }
    }

    fn translate_event(name: &str) -> Option<Signal> {
        match name {
            "play" | "playing" => Some(Signal::Play),
            // Buffering stalls stop the estimate until playback resumes
            "pause" | "waiting" | "ended" => Some(Signal::Pause),
            _ => None,
        }
    }
}

impl EventSource for StreamAdapter {
    fn kind(&self) -> MediaKind {
        MediaKind::Stream
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

        let message = StreamMessage::deserialize(data)
            .map_err(|e| AdapterError::MalformedMessage(e.to_string()))?;

        match message {
            StreamMessage::PropertyChange { property, value } if property == "currentTime" => {
                let seconds = value.as_f64().ok_or_else(|| {
                    AdapterError::MalformedMessage(format!("currentTime is not a number: {value}"))
                })?;
                let position = position_from_secs(seconds)?;
                Ok(self
                    .guard
                    .admit(MediaKind::Stream, position)
                    .map(Signal::ProgressSample))
            }
            StreamMessage::PropertyChange { property, .. } => {
                trace!(
                    target: "preview.adapter",
                    kind = "stream",
                    property = %property,
                    "Ignoring property change"
                );
                Ok(None)
            }
            StreamMessage::Event { event_name } => Ok(Self::translate_event(&event_name)),
            StreamMessage::Other => Ok(None),
        }
    }

    fn on_script_failed(&mut self, error: &AdapterError) -> Option<Signal> {
        if self.mode == TrackingMode::FallbackOnly {
            return None;
        }
        warn!(
            target: "preview.adapter",
            kind = "stream",
            error = %error,
            "Stream player API unavailable, falling back to timer-only tracking"
        );
        self.mode = TrackingMode::FallbackOnly;
        self.loaded.then_some(Signal::Play)
    }
}
