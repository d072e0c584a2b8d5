//! YouTube iframe adapter.
//!
//! The embed exposes no authoritative progress channel we can rely on, so the
//! only usable signal is the iframe load event. Playback is assumed from load
//! and the fallback timer does all the accounting.

use super::{EventSource, Signal, TrackingMode};
use crate::errors::AdapterError;
use crate::types::MediaKind;
use serde_json::Value;
use tracing::debug;

#[derive(Debug)]
pub struct YouTubeAdapter {
    origin: String,
    loads: u32,
}

impl YouTubeAdapter {
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            loads: 0,
        }
    }
}

impl EventSource for YouTubeAdapter {
    fn kind(&self) -> MediaKind {
        MediaKind::YouTube
    }

    fn expected_origin(&self) -> &str {
        &self.origin
    }

    fn mode(&self) -> TrackingMode {
        TrackingMode::FallbackOnly
    }

    fn on_loaded(&mut self) -> Option<Signal> {
        self.loads += 1;
        if self.loads > 1 {
            // Reload: Play is idempotent on the clock, the running segment continues
            debug!(
                target: "preview.adapter",
                kind = "youtube",
                loads = self.loads,
                "YouTube iframe reloaded"
            );
        }
        Some(Signal::Play)
    }

    fn translate(&mut self, _data: &Value) -> Result<Option<Signal>, AdapterError> {
        Ok(None)
    }

    fn on_script_failed(&mut self, _error: &AdapterError) -> Option<Signal> {
        // Already timer-only; nothing to degrade
        None
    }
}
